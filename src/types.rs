//! Core types used throughout the trading system
//!
//! Everything here is an immutable, point-in-time value: snapshots are
//! replaced wholesale every cycle and proposals live for a single cycle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange-assigned order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order class
///
/// Entries are resting buys (`bid` on the wire); exits are the take-profit
/// sells (`ask` on the wire) the exchange creates for each filled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Entry,
    Exit,
}

impl OrderSide {
    /// Parse the wire action tag
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "bid" => Some(OrderSide::Entry),
            "ask" => Some(OrderSide::Exit),
            _ => None,
        }
    }

    pub fn as_action(&self) -> &'static str {
        match self {
            OrderSide::Entry => "bid",
            OrderSide::Exit => "ask",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderSide::Entry => write!(f, "ENTRY"),
            OrderSide::Exit => write!(f, "EXIT"),
        }
    }
}

/// Account balances in JPY and BTC
///
/// `funds_*` are the freely available amounts, `deposit_*` include what is
/// locked in resting orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub funds_jpy: Decimal,
    pub funds_btc: Decimal,
    pub deposit_jpy: Decimal,
    pub deposit_btc: Decimal,
}

/// One price level of the order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl BookLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        BookLevel { price, quantity }
    }
}

/// Order book with asks ascending and bids descending by price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub asks: Vec<BookLevel>,
    pub bids: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    /// Build a book, normalising level order regardless of input order
    pub fn new(mut asks: Vec<BookLevel>, mut bids: Vec<BookLevel>) -> Self {
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        OrderBookSnapshot { asks, bids }
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }
}

/// A resting order on the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub id: OrderId,
    pub side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
}

impl ActiveOrder {
    pub fn is_entry(&self) -> bool {
        self.side == OrderSide::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.side == OrderSide::Exit
    }
}

/// A fill from our trade history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub price: Decimal,
    /// True when our side of the fill was the buy
    pub initiated_by_us: bool,
}

/// Entry order sized and priced by the grid pricer
///
/// Values are unrounded; tick and lot rounding happen when the gateway
/// encodes the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedOrder {
    pub entry_price: Decimal,
    pub take_profit_price: Decimal,
    pub amount: Decimal,
    pub budget_jpy: Decimal,
}

/// Controller mode, the only strategy state carried across cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrategyMode {
    #[default]
    Accumulating,
    Liquidating,
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrategyMode::Accumulating => write!(f, "ACCUMULATING"),
            StrategyMode::Liquidating => write!(f, "LIQUIDATING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_from_action() {
        assert_eq!(OrderSide::from_action("bid"), Some(OrderSide::Entry));
        assert_eq!(OrderSide::from_action("ask"), Some(OrderSide::Exit));
        assert_eq!(OrderSide::from_action("buy"), None);
        assert_eq!(OrderSide::Entry.as_action(), "bid");
    }

    #[test]
    fn test_order_book_normalises_level_order() {
        let book = OrderBookSnapshot::new(
            vec![
                BookLevel::new(dec!(110), dec!(1)),
                BookLevel::new(dec!(100), dec!(2)),
            ],
            vec![
                BookLevel::new(dec!(90), dec!(1)),
                BookLevel::new(dec!(95), dec!(1)),
            ],
        );

        assert_eq!(book.best_ask(), Some(dec!(100)));
        assert_eq!(book.best_bid(), Some(dec!(95)));
        assert_eq!(book.asks[1].price, dec!(110));
    }

    #[test]
    fn test_empty_book_has_no_best_prices() {
        let book = OrderBookSnapshot::default();
        assert!(book.best_ask().is_none());
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn test_default_mode_is_accumulating() {
        assert_eq!(StrategyMode::default(), StrategyMode::Accumulating);
        assert_eq!(StrategyMode::Liquidating.to_string(), "LIQUIDATING");
    }
}
