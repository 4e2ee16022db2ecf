//! Grid entry pricing and sizing
//!
//! Budget is split equally across the remaining position slots and
//! recomputed every cycle. The entry price steps down from the latest trade,
//! or from the best bid while exactly one position is open. Without a price
//! reference the entry is sized as a market order against the asks.

use rust_decimal::Decimal;
use tracing::debug;

use super::liquidity;
use super::snapshot::MarketSnapshot;
use crate::config::StrategyConfig;
use crate::error::{GridBotError, Result};
use crate::tick::TickRules;
use crate::types::ProposedOrder;

pub struct GridPricer {
    config: StrategyConfig,
    rules: TickRules,
}

impl GridPricer {
    pub fn new(config: StrategyConfig, rules: TickRules) -> Self {
        GridPricer { config, rules }
    }

    /// Next entry to place, or `None` when every position slot is used
    pub fn propose(&self, snapshot: &MarketSnapshot) -> Result<Option<ProposedOrder>> {
        let position_count = snapshot.position_count();
        if position_count >= self.config.max_position_count {
            debug!(
                "No capacity: {} of {} positions open",
                position_count, self.config.max_position_count
            );
            return Ok(None);
        }
        let remaining_slots = Decimal::from(self.config.max_position_count - position_count);

        let available = snapshot.account.funds_jpy;
        if available <= Decimal::ZERO {
            return Err(GridBotError::InsufficientFunds { available });
        }
        let budget_jpy = available / remaining_slots;

        let last_price = match snapshot.last_trade_price() {
            Some(price) if position_count > 0 => price,
            _ => return self.market_entry(snapshot, budget_jpy).map(Some),
        };

        let initiated_by_us = snapshot.last_trade().is_some_and(|t| t.initiated_by_us);
        let mut entry_price = if initiated_by_us {
            last_price * (Decimal::ONE - self.config.buy_range)
        } else {
            // our exit filled, or a third-party trade: back out the markup
            last_price / (Decimal::ONE + self.config.take_profit_range)
        };

        if position_count == 1 {
            let best_bid = snapshot.best_bid().ok_or_else(|| {
                GridBotError::InvalidOrderBook("no bid to price from".to_string())
            })?;
            entry_price = best_bid * (Decimal::ONE - self.config.buy_range);
        }

        if entry_price <= Decimal::ZERO {
            return Err(GridBotError::InvalidOrderBook(format!(
                "non-positive entry price {}",
                entry_price
            )));
        }

        let proposal = ProposedOrder {
            entry_price,
            take_profit_price: entry_price * (Decimal::ONE + self.config.take_profit_range),
            amount: budget_jpy / entry_price,
            budget_jpy,
        };
        self.check_lot(&proposal, available)?;
        Ok(Some(proposal))
    }

    /// Entry sized by walking the asks with the whole slot budget
    fn market_entry(&self, snapshot: &MarketSnapshot, budget_jpy: Decimal) -> Result<ProposedOrder> {
        let fill = liquidity::walk(&snapshot.order_book.asks, budget_jpy)?;
        let proposal = ProposedOrder {
            entry_price: fill.price,
            take_profit_price: self.config.market_entry_take_profit,
            amount: fill.quantity,
            budget_jpy,
        };
        self.check_lot(&proposal, snapshot.account.funds_jpy)?;
        Ok(proposal)
    }

    fn check_lot(&self, proposal: &ProposedOrder, available: Decimal) -> Result<()> {
        if self.rules.round_amount(proposal.amount) <= Decimal::ZERO {
            return Err(GridBotError::InsufficientFunds { available });
        }
        Ok(())
    }
}
