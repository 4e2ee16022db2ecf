//! Stop-loss trigger
//!
//! Fires only once every position slot is used: while slots remain, a
//! falling price is met with further grid entries instead.

use rust_decimal::Decimal;

use super::snapshot::MarketSnapshot;
use crate::config::StrategyConfig;

pub struct StopLossDetector {
    buy_range: Decimal,
    max_position_count: usize,
}

impl StopLossDetector {
    pub fn new(config: &StrategyConfig) -> Self {
        StopLossDetector {
            buy_range: config.buy_range,
            max_position_count: config.max_position_count,
        }
    }

    /// Fully committed and the best ask is a grid step below the last trade
    pub fn should_liquidate(&self, snapshot: &MarketSnapshot) -> bool {
        if snapshot.position_count() < self.max_position_count {
            return false;
        }
        match (snapshot.best_ask(), snapshot.last_trade_price()) {
            (Some(best_ask), Some(last_price)) => {
                best_ask < last_price * (Decimal::ONE - self.buy_range)
            }
            _ => false,
        }
    }
}
