//! Exchange tick and lot rounding
//!
//! The decision engine works in full precision. Outgoing prices and amounts
//! pass through [`TickRules`] exactly once, when the gateway encodes them.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Minimum price increment and amount precision of a market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRules {
    pub price_tick: Decimal,
    pub amount_scale: u32,
}

impl Default for TickRules {
    /// Zaif BTC/JPY: 5 JPY ticks, 0.0001 BTC lots
    fn default() -> Self {
        TickRules {
            price_tick: dec!(5),
            amount_scale: 4,
        }
    }
}

impl TickRules {
    pub fn new(price_tick: Decimal, amount_scale: u32) -> Self {
        TickRules {
            price_tick,
            amount_scale,
        }
    }

    /// Round a price up to the next tick; prices on a tick are unchanged
    pub fn round_price(&self, price: Decimal) -> Decimal {
        if self.price_tick <= Decimal::ZERO {
            return price;
        }
        ((price / self.price_tick).ceil() * self.price_tick).normalize()
    }

    /// Truncate an amount to the lot precision
    pub fn round_amount(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.amount_scale, RoundingStrategy::ToZero)
    }

    /// Wire form of a price
    pub fn format_price(&self, price: Decimal) -> String {
        self.round_price(price).to_string()
    }

    /// Wire form of an amount, always with `amount_scale` decimals
    pub fn format_amount(&self, amount: Decimal) -> String {
        let mut rounded = self.round_amount(amount);
        rounded.rescale(self.amount_scale);
        rounded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price_up_to_tick() {
        let rules = TickRules::default();
        assert_eq!(rules.round_price(dec!(199901)), dec!(199905));
        assert_eq!(rules.round_price(dec!(199904.99)), dec!(199905));
        assert_eq!(rules.round_price(dec!(201899)), dec!(201900));
    }

    #[test]
    fn test_price_on_tick_is_unchanged() {
        let rules = TickRules::default();
        assert_eq!(rules.round_price(dec!(199900)), dec!(199900));
        assert_eq!(rules.round_price(dec!(199900.0000)), dec!(199900));
    }

    #[test]
    fn test_round_amount_truncates() {
        let rules = TickRules::default();
        assert_eq!(rules.round_amount(dec!(0.12349)), dec!(0.1234));
        assert_eq!(rules.round_amount(dec!(0.00009)), dec!(0));
        assert_eq!(rules.round_amount(dec!(1.5)), dec!(1.5));
    }

    #[test]
    fn test_wire_formatting() {
        let rules = TickRules::default();
        assert_eq!(rules.format_amount(dec!(0.5)), "0.5000");
        assert_eq!(rules.format_amount(dec!(0.123456789)), "0.1234");
        assert_eq!(rules.format_price(dec!(199900.5)), "199905");
        assert_eq!(rules.format_price(dec!(50000000)), "50000000");
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let rules = TickRules::default();
        let price = rules.round_price(dec!(123457.3));
        assert_eq!(rules.round_price(price), price);
        let amount = rules.round_amount(dec!(0.987654));
        assert_eq!(rules.round_amount(amount), amount);
    }
}
