//! Strategy Controller
//!
//! Drives one fetch → decide → act cycle at a time over two modes:
//! - `Accumulating`: keep one fresh grid entry resting below the market
//! - `Liquidating`: cancel everything and sell the whole BTC deposit
//!
//! The mode and the latest snapshot are the only state kept between cycles.
//! Every failure ends the current cycle; exchange state is re-read on the
//! next one.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::pricer::GridPricer;
use super::reconciler::OrderReconciler;
use super::snapshot::{MarketSnapshot, SnapshotAggregator};
use super::stop_loss::StopLossDetector;
use crate::config::StrategyConfig;
use crate::error::Result;
use crate::gateway::ExchangeGateway;
use crate::types::{OrderId, StrategyMode};

/// What a successful cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Observe-only mode; nothing was sent
    Observed,
    /// Every position slot is in use
    NoCapacity,
    /// A resting entry already covers the proposal
    EntryAlreadyResting,
    EntrySubmitted(OrderId),
    /// Orders cancelled and deposit sold; back to accumulating
    Liquidated,
}

pub struct StrategyController<G: ExchangeGateway> {
    gateway: G,
    aggregator: SnapshotAggregator,
    pricer: GridPricer,
    reconciler: OrderReconciler,
    detector: StopLossDetector,
    mode: StrategyMode,
    last_snapshot: Option<MarketSnapshot>,
    observe_only: bool,
    cycle_count: u64,
}

impl<G: ExchangeGateway> StrategyController<G> {
    pub fn new(gateway: G, config: &StrategyConfig, trade_history_limit: usize) -> Self {
        let rules = gateway.tick_rules();
        StrategyController {
            aggregator: SnapshotAggregator::new(trade_history_limit),
            pricer: GridPricer::new(config.clone(), rules),
            reconciler: OrderReconciler::new(rules),
            detector: StopLossDetector::new(config),
            gateway,
            mode: StrategyMode::Accumulating,
            last_snapshot: None,
            observe_only: false,
            cycle_count: 0,
        }
    }

    /// Evaluate and log only; never cancel or submit
    pub fn observe_only(mut self, enabled: bool) -> Self {
        self.observe_only = enabled;
        self
    }

    pub fn mode(&self) -> StrategyMode {
        self.mode
    }

    pub fn last_snapshot(&self) -> Option<&MarketSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Run one full cycle
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycle_count += 1;

        let snapshot = self.aggregator.refresh(&self.gateway).await?;
        self.report(&snapshot);
        self.last_snapshot = Some(snapshot.clone());

        let stop_loss = self.detector.should_liquidate(&snapshot);

        if self.observe_only {
            self.observe(&snapshot, stop_loss);
            return Ok(CycleOutcome::Observed);
        }

        if stop_loss && self.mode == StrategyMode::Accumulating {
            warn!(
                "Stop-loss triggered: best ask {:?} below grid step from last trade {:?}",
                snapshot.best_ask(),
                snapshot.last_trade_price()
            );
            self.mode = StrategyMode::Liquidating;
        }

        match self.mode {
            StrategyMode::Liquidating => self.liquidate(&snapshot).await,
            StrategyMode::Accumulating => self.accumulate(&snapshot).await,
        }
    }

    async fn liquidate(&mut self, snapshot: &MarketSnapshot) -> Result<CycleOutcome> {
        self.reconciler
            .cancel_all(&self.gateway, &snapshot.active_orders)
            .await?;

        let holdings = snapshot.account.deposit_btc;
        if self.gateway.tick_rules().round_amount(holdings) > Decimal::ZERO {
            self.gateway.sell_market(holdings).await?;
            info!("Sold {} BTC at market", holdings);
        } else {
            info!("No BTC left to sell");
        }

        self.mode = StrategyMode::Accumulating;
        info!("Liquidation complete, resuming accumulation");
        Ok(CycleOutcome::Liquidated)
    }

    async fn accumulate(&mut self, snapshot: &MarketSnapshot) -> Result<CycleOutcome> {
        let proposal = match self.pricer.propose(snapshot)? {
            Some(proposal) => proposal,
            None => return Ok(CycleOutcome::NoCapacity),
        };

        if self
            .reconciler
            .has_dominant_entry(&proposal, &snapshot.active_orders)
        {
            debug!(
                "Entry at or above {} already resting, skipping",
                proposal.entry_price
            );
            return Ok(CycleOutcome::EntryAlreadyResting);
        }

        self.reconciler
            .cancel_entries(&self.gateway, &snapshot.active_orders)
            .await?;

        let id = self
            .gateway
            .submit_entry(
                proposal.entry_price,
                proposal.take_profit_price,
                proposal.amount,
            )
            .await?;

        info!(
            "Entry submitted: id={} price={} take_profit={} amount={} budget={}",
            id,
            proposal.entry_price.round_dp(2),
            proposal.take_profit_price.round_dp(2),
            proposal.amount.round_dp(8),
            proposal.budget_jpy.round_dp(2)
        );
        Ok(CycleOutcome::EntrySubmitted(id))
    }

    fn observe(&self, snapshot: &MarketSnapshot, stop_loss: bool) {
        info!("[observe] stop-loss verdict: {}", stop_loss);
        match self.pricer.propose(snapshot) {
            Ok(Some(p)) => info!(
                "[observe] would propose price={} take_profit={} amount={} (dominated: {})",
                p.entry_price.round_dp(2),
                p.take_profit_price.round_dp(2),
                p.amount.round_dp(8),
                self.reconciler.has_dominant_entry(&p, &snapshot.active_orders)
            ),
            Ok(None) => info!("[observe] no capacity for another entry"),
            Err(e) => info!("[observe] no proposal: {}", e),
        }
    }

    fn report(&self, snapshot: &MarketSnapshot) {
        let total = snapshot
            .total_assets_jpy()
            .map(|t| t.round_dp(0).to_string())
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            "Cycle {} [{}] positions={} entries={} jpy={} btc={} total_assets={}",
            self.cycle_count,
            self.mode,
            snapshot.position_count(),
            snapshot.pending_entry_count(),
            snapshot.account.deposit_jpy,
            snapshot.account.deposit_btc,
            total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridBotError;
    use crate::gateway::mock::{MockCall, MockGateway};
    use crate::types::{
        AccountSnapshot, ActiveOrder, BookLevel, OrderBookSnapshot, OrderSide, TradeRecord,
    };
    use rust_decimal_macros::dec;

    fn config(max_positions: usize) -> StrategyConfig {
        StrategyConfig {
            max_position_count: max_positions,
            ..StrategyConfig::default()
        }
    }

    async fn gateway_with(positions: usize, best_ask: Decimal, last: Decimal) -> MockGateway {
        let gateway = MockGateway::new();
        gateway
            .set_account(AccountSnapshot {
                funds_jpy: dec!(300000),
                funds_btc: dec!(0),
                deposit_jpy: dec!(300000),
                deposit_btc: dec!(0.03),
            })
            .await;
        gateway
            .set_active_orders(
                (0..positions)
                    .map(|i| ActiveOrder {
                        id: OrderId(i as u64 + 1),
                        side: OrderSide::Exit,
                        price: dec!(102000),
                        amount: dec!(0.01),
                    })
                    .collect(),
            )
            .await;
        gateway
            .set_trades(vec![TradeRecord {
                price: last,
                initiated_by_us: true,
            }])
            .await;
        gateway
            .set_order_book(OrderBookSnapshot::new(
                vec![BookLevel::new(best_ask, dec!(10))],
                vec![BookLevel::new(best_ask - dec!(5), dec!(10))],
            ))
            .await;
        gateway
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_cycle() {
        let gateway = gateway_with(3, dec!(95000), dec!(100000)).await;
        gateway.fail_on(MockCall::FetchOrderBook).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3);

        assert!(controller.run_cycle().await.is_err());
        assert_eq!(controller.mode(), StrategyMode::Accumulating);
        assert!(controller.last_snapshot().is_none());
        assert!(controller.gateway().mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_observe_only_never_mutates() {
        let gateway = gateway_with(3, dec!(95000), dec!(100000)).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3).observe_only(true);

        assert_eq!(controller.run_cycle().await.unwrap(), CycleOutcome::Observed);
        assert_eq!(controller.mode(), StrategyMode::Accumulating);
        assert!(controller.gateway().mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_liquidation_sells_deposit() {
        let gateway = gateway_with(3, dec!(95000), dec!(100000)).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3);

        assert_eq!(controller.run_cycle().await.unwrap(), CycleOutcome::Liquidated);
        assert_eq!(controller.mode(), StrategyMode::Accumulating);
        assert_eq!(*controller.gateway().market_sells.lock().await, vec![dec!(0.03)]);
        assert!(controller.gateway().active_orders.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_sale_stays_liquidating() {
        let gateway = gateway_with(3, dec!(95000), dec!(100000)).await;
        gateway.fail_on(MockCall::SellMarket).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3);

        assert!(matches!(
            controller.run_cycle().await,
            Err(GridBotError::Exchange(_))
        ));
        assert_eq!(controller.mode(), StrategyMode::Liquidating);
    }

    #[tokio::test]
    async fn test_full_without_drop_is_no_capacity() {
        let gateway = gateway_with(3, dec!(99990), dec!(100000)).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3);

        assert_eq!(controller.run_cycle().await.unwrap(), CycleOutcome::NoCapacity);
        assert!(controller.gateway().mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_count_and_snapshot_kept() {
        let gateway = gateway_with(3, dec!(99990), dec!(100000)).await;
        let mut controller = StrategyController::new(gateway, &config(3), 3);

        controller.run_cycle().await.unwrap();
        controller.run_cycle().await.unwrap();
        assert_eq!(controller.cycle_count(), 2);
        assert_eq!(
            controller.last_snapshot().map(|s| s.position_count()),
            Some(3)
        );
    }
}
