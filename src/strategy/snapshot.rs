//! Point-in-time market and account view
//!
//! [`SnapshotAggregator::refresh`] fetches account, active orders, trade
//! history and order book in that order and returns them as one immutable
//! [`MarketSnapshot`]. The first failure aborts the refresh; there is no
//! partial result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Result;
use crate::gateway::ExchangeGateway;
use crate::types::{AccountSnapshot, ActiveOrder, OrderBookSnapshot, TradeRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub account: AccountSnapshot,
    pub active_orders: Vec<ActiveOrder>,
    /// Most recent first
    pub trades: Vec<TradeRecord>,
    pub order_book: OrderBookSnapshot,
    pub taken_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(
        account: AccountSnapshot,
        active_orders: Vec<ActiveOrder>,
        trades: Vec<TradeRecord>,
        order_book: OrderBookSnapshot,
    ) -> Self {
        MarketSnapshot {
            account,
            active_orders,
            trades,
            order_book,
            taken_at: Utc::now(),
        }
    }

    /// Open positions, one per resting exit order
    pub fn position_count(&self) -> usize {
        self.active_orders.iter().filter(|o| o.is_exit()).count()
    }

    pub fn pending_entry_count(&self) -> usize {
        self.active_orders.iter().filter(|o| o.is_entry()).count()
    }

    pub fn last_trade(&self) -> Option<&TradeRecord> {
        self.trades.first()
    }

    /// Price of the latest trade, treating a non-positive price as absent
    pub fn last_trade_price(&self) -> Option<Decimal> {
        self.last_trade()
            .map(|t| t.price)
            .filter(|p| *p > Decimal::ZERO)
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.order_book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.order_book.best_ask()
    }

    /// Deposit valued at the best ask, in JPY
    pub fn total_assets_jpy(&self) -> Option<Decimal> {
        self.best_ask()
            .map(|ask| ask * self.account.deposit_btc + self.account.deposit_jpy)
    }
}

/// Builds snapshots from an exchange gateway
pub struct SnapshotAggregator {
    trade_history_limit: usize,
}

impl SnapshotAggregator {
    pub fn new(trade_history_limit: usize) -> Self {
        SnapshotAggregator {
            trade_history_limit: trade_history_limit.max(1),
        }
    }

    pub async fn refresh<G: ExchangeGateway + ?Sized>(&self, gateway: &G) -> Result<MarketSnapshot> {
        let account = gateway.fetch_account().await?;
        let active_orders = gateway.fetch_active_orders().await?;
        let trades = gateway.fetch_trade_history(self.trade_history_limit).await?;
        let order_book = gateway.fetch_order_book().await?;

        let snapshot = MarketSnapshot::new(account, active_orders, trades, order_book);
        debug!(
            "Snapshot: positions={} entries={} trades={} asks={} bids={}",
            snapshot.position_count(),
            snapshot.pending_entry_count(),
            snapshot.trades.len(),
            snapshot.order_book.asks.len(),
            snapshot.order_book.bids.len()
        );
        Ok(snapshot)
    }
}

impl Default for SnapshotAggregator {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridBotError;
    use crate::gateway::mock::{MockCall, MockGateway};
    use crate::types::{BookLevel, OrderId, OrderSide};
    use rust_decimal_macros::dec;

    fn order(id: u64, side: OrderSide, price: Decimal) -> ActiveOrder {
        ActiveOrder {
            id: OrderId(id),
            side,
            price,
            amount: dec!(0.01),
        }
    }

    async fn seeded_gateway() -> MockGateway {
        let gateway = MockGateway::new();
        gateway
            .set_account(AccountSnapshot {
                funds_jpy: dec!(100000),
                funds_btc: dec!(0),
                deposit_jpy: dec!(100000),
                deposit_btc: dec!(0.5),
            })
            .await;
        gateway
            .set_active_orders(vec![
                order(1, OrderSide::Exit, dec!(202000)),
                order(2, OrderSide::Exit, dec!(203000)),
                order(3, OrderSide::Entry, dec!(199000)),
            ])
            .await;
        gateway
            .set_order_book(OrderBookSnapshot::new(
                vec![BookLevel::new(dec!(200010), dec!(1))],
                vec![BookLevel::new(dec!(200000), dec!(1))],
            ))
            .await;
        gateway
    }

    #[tokio::test]
    async fn test_refresh_fetches_in_order() {
        let gateway = seeded_gateway().await;
        let snapshot = SnapshotAggregator::default().refresh(&gateway).await.unwrap();

        assert_eq!(
            *gateway.calls.lock().await,
            vec![
                MockCall::FetchAccount,
                MockCall::FetchActiveOrders,
                MockCall::FetchTradeHistory,
                MockCall::FetchOrderBook,
            ]
        );
        assert_eq!(snapshot.position_count(), 2);
        assert_eq!(snapshot.pending_entry_count(), 1);
        assert_eq!(snapshot.best_bid(), Some(dec!(200000)));
    }

    #[tokio::test]
    async fn test_refresh_fails_fast() {
        let gateway = seeded_gateway().await;
        gateway.fail_on(MockCall::FetchActiveOrders).await;

        let result = SnapshotAggregator::default().refresh(&gateway).await;

        assert!(matches!(result, Err(GridBotError::Exchange(_))));
        assert_eq!(
            *gateway.calls.lock().await,
            vec![MockCall::FetchAccount, MockCall::FetchActiveOrders]
        );
    }

    #[tokio::test]
    async fn test_missing_bids_fail_refresh() {
        let gateway = seeded_gateway().await;
        gateway
            .set_order_book(OrderBookSnapshot::new(
                vec![BookLevel::new(dec!(200010), dec!(1))],
                vec![],
            ))
            .await;

        let result = SnapshotAggregator::default().refresh(&gateway).await;
        assert!(matches!(result, Err(GridBotError::InvalidOrderBook(_))));
    }

    #[test]
    fn test_total_assets_valued_at_best_ask() {
        let snapshot = MarketSnapshot::new(
            AccountSnapshot {
                deposit_jpy: dec!(50000),
                deposit_btc: dec!(0.5),
                ..Default::default()
            },
            vec![],
            vec![],
            OrderBookSnapshot::new(
                vec![BookLevel::new(dec!(200000), dec!(1))],
                vec![BookLevel::new(dec!(199990), dec!(1))],
            ),
        );
        assert_eq!(snapshot.total_assets_jpy(), Some(dec!(150000)));
    }

    #[test]
    fn test_zero_priced_trade_is_no_reference() {
        let snapshot = MarketSnapshot::new(
            AccountSnapshot::default(),
            vec![],
            vec![TradeRecord {
                price: dec!(0),
                initiated_by_us: true,
            }],
            OrderBookSnapshot::default(),
        );
        assert!(snapshot.last_trade().is_some());
        assert!(snapshot.last_trade_price().is_none());
    }
}
