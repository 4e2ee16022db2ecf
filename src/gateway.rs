//! Exchange gateway abstraction
//!
//! The strategy only ever talks to the exchange through [`ExchangeGateway`],
//! which keeps the decision engine testable against [`mock::MockGateway`].

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::tick::TickRules;
use crate::types::{AccountSnapshot, ActiveOrder, OrderBookSnapshot, OrderId, TradeRecord};

/// Typed snapshot fetches and order mutations against one market
///
/// Implementations round outgoing prices and amounts with their
/// [`TickRules`]; callers pass full-precision values.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn fetch_account(&self) -> Result<AccountSnapshot>;

    async fn fetch_active_orders(&self) -> Result<Vec<ActiveOrder>>;

    /// Most recent trades first
    async fn fetch_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>>;

    /// Must fail when the book has no bids
    async fn fetch_order_book(&self) -> Result<OrderBookSnapshot>;

    /// Place a limit buy whose fill creates a take-profit sell at `take_profit`
    async fn submit_entry(
        &self,
        price: Decimal,
        take_profit: Decimal,
        amount: Decimal,
    ) -> Result<OrderId>;

    async fn cancel_order(&self, id: OrderId) -> Result<()>;

    async fn sell_market(&self, amount: Decimal) -> Result<()>;

    /// Rounding applied to outgoing orders
    fn tick_rules(&self) -> TickRules;
}

/// In-memory gateway for tests
pub mod mock {
    use super::*;
    use crate::error::GridBotError;
    use crate::types::OrderSide;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Gateway operation, used to record call order and inject failures
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum MockCall {
        FetchAccount,
        FetchActiveOrders,
        FetchTradeHistory,
        FetchOrderBook,
        SubmitEntry,
        CancelOrder,
        SellMarket,
    }

    /// Arguments of a recorded `submit_entry` call
    #[derive(Debug, Clone, PartialEq)]
    pub struct SubmittedEntry {
        pub id: OrderId,
        pub price: Decimal,
        pub take_profit: Decimal,
        pub amount: Decimal,
    }

    /// Mock exchange holding account, orders, trades and book in memory
    ///
    /// Submitted entries rest in `active_orders` with rounded values,
    /// cancellations remove them and market sells draw down `deposit_btc`.
    pub struct MockGateway {
        pub account: Arc<Mutex<AccountSnapshot>>,
        pub active_orders: Arc<Mutex<Vec<ActiveOrder>>>,
        pub trades: Arc<Mutex<Vec<TradeRecord>>>,
        pub order_book: Arc<Mutex<OrderBookSnapshot>>,
        pub calls: Arc<Mutex<Vec<MockCall>>>,
        pub submitted: Arc<Mutex<Vec<SubmittedEntry>>>,
        pub cancelled: Arc<Mutex<Vec<OrderId>>>,
        pub market_sells: Arc<Mutex<Vec<Decimal>>>,
        failing_calls: Arc<Mutex<HashSet<MockCall>>>,
        failing_cancels: Arc<Mutex<HashSet<OrderId>>>,
        rules: TickRules,
        next_id: AtomicU64,
    }

    impl Default for MockGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self {
                account: Arc::new(Mutex::new(AccountSnapshot::default())),
                active_orders: Arc::new(Mutex::new(Vec::new())),
                trades: Arc::new(Mutex::new(Vec::new())),
                order_book: Arc::new(Mutex::new(OrderBookSnapshot::default())),
                calls: Arc::new(Mutex::new(Vec::new())),
                submitted: Arc::new(Mutex::new(Vec::new())),
                cancelled: Arc::new(Mutex::new(Vec::new())),
                market_sells: Arc::new(Mutex::new(Vec::new())),
                failing_calls: Arc::new(Mutex::new(HashSet::new())),
                failing_cancels: Arc::new(Mutex::new(HashSet::new())),
                rules: TickRules::default(),
                next_id: AtomicU64::new(1000),
            }
        }

        pub async fn set_account(&self, account: AccountSnapshot) {
            *self.account.lock().await = account;
        }

        pub async fn set_active_orders(&self, orders: Vec<ActiveOrder>) {
            *self.active_orders.lock().await = orders;
        }

        pub async fn set_trades(&self, trades: Vec<TradeRecord>) {
            *self.trades.lock().await = trades;
        }

        pub async fn set_order_book(&self, book: OrderBookSnapshot) {
            *self.order_book.lock().await = book;
        }

        /// Make every call of this kind fail until cleared
        pub async fn fail_on(&self, call: MockCall) {
            self.failing_calls.lock().await.insert(call);
        }

        pub async fn clear_failure(&self, call: MockCall) {
            self.failing_calls.lock().await.remove(&call);
        }

        /// Make cancellation of one specific order fail
        pub async fn fail_cancel_of(&self, id: OrderId) {
            self.failing_cancels.lock().await.insert(id);
        }

        pub async fn clear_cancel_failures(&self) {
            self.failing_cancels.lock().await.clear();
        }

        /// Recorded mutations only (fetches filtered out)
        pub async fn mutations(&self) -> Vec<MockCall> {
            self.calls
                .lock()
                .await
                .iter()
                .copied()
                .filter(|c| {
                    matches!(
                        c,
                        MockCall::SubmitEntry | MockCall::CancelOrder | MockCall::SellMarket
                    )
                })
                .collect()
        }

        async fn record(&self, call: MockCall) -> Result<()> {
            self.calls.lock().await.push(call);
            if self.failing_calls.lock().await.contains(&call) {
                return Err(GridBotError::Exchange(format!("mock failure on {:?}", call)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ExchangeGateway for MockGateway {
        async fn fetch_account(&self) -> Result<AccountSnapshot> {
            self.record(MockCall::FetchAccount).await?;
            Ok(self.account.lock().await.clone())
        }

        async fn fetch_active_orders(&self) -> Result<Vec<ActiveOrder>> {
            self.record(MockCall::FetchActiveOrders).await?;
            Ok(self.active_orders.lock().await.clone())
        }

        async fn fetch_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>> {
            self.record(MockCall::FetchTradeHistory).await?;
            Ok(self.trades.lock().await.iter().take(limit).cloned().collect())
        }

        async fn fetch_order_book(&self) -> Result<OrderBookSnapshot> {
            self.record(MockCall::FetchOrderBook).await?;
            let book = self.order_book.lock().await.clone();
            if book.bids.is_empty() {
                return Err(GridBotError::InvalidOrderBook("no bids".to_string()));
            }
            Ok(book)
        }

        async fn submit_entry(
            &self,
            price: Decimal,
            take_profit: Decimal,
            amount: Decimal,
        ) -> Result<OrderId> {
            self.record(MockCall::SubmitEntry).await?;
            let id = OrderId(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.submitted.lock().await.push(SubmittedEntry {
                id,
                price,
                take_profit,
                amount,
            });
            self.active_orders.lock().await.push(ActiveOrder {
                id,
                side: OrderSide::Entry,
                price: self.rules.round_price(price),
                amount: self.rules.round_amount(amount),
            });
            Ok(id)
        }

        async fn cancel_order(&self, id: OrderId) -> Result<()> {
            self.record(MockCall::CancelOrder).await?;
            if self.failing_cancels.lock().await.contains(&id) {
                return Err(GridBotError::Exchange(format!("order {} not found", id)));
            }
            self.cancelled.lock().await.push(id);
            self.active_orders.lock().await.retain(|o| o.id != id);
            Ok(())
        }

        async fn sell_market(&self, amount: Decimal) -> Result<()> {
            self.record(MockCall::SellMarket).await?;
            self.market_sells.lock().await.push(amount);
            let mut account = self.account.lock().await;
            let sold = self.rules.round_amount(amount);
            account.deposit_btc -= sold;
            account.funds_btc = (account.funds_btc - sold).max(Decimal::ZERO);
            Ok(())
        }

        fn tick_rules(&self) -> TickRules {
            self.rules
        }
    }
}
