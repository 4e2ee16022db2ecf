//! Depth-aware market order simulation

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{GridBotError, Result};
use crate::types::BookLevel;

/// Decimal places kept for the fractional quantity at the last level
pub const QUANTITY_SCALE: u32 = 8;

/// Outcome of spending a budget against the ask side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    /// Worst (last touched) price level
    pub price: Decimal,
    pub quantity: Decimal,
    /// JPY actually consumed, never above the budget
    pub cost: Decimal,
}

/// Walk `asks` (ascending) spending `budget`
///
/// Levels the remaining budget covers are consumed whole. At the first level
/// it cannot cover, the affordable fraction is taken and the walk stops with
/// that level's price as the fill price. Running out of book before running
/// out of budget is [`GridBotError::InsufficientLiquidity`].
pub fn walk(asks: &[BookLevel], budget: Decimal) -> Result<Fill> {
    let mut remaining = budget;
    let mut quantity = Decimal::ZERO;
    let mut cost = Decimal::ZERO;

    for level in asks {
        if level.price <= Decimal::ZERO {
            continue;
        }

        let level_cost = level.price * level.quantity;
        if level_cost <= remaining {
            remaining -= level_cost;
            quantity += level.quantity;
            cost += level_cost;
            continue;
        }

        let partial = (remaining / level.price)
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero);
        return Ok(Fill {
            price: level.price,
            quantity: quantity + partial,
            cost: cost + partial * level.price,
        });
    }

    Err(GridBotError::InsufficientLiquidity { budget, remaining })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(levels: &[(Decimal, Decimal)]) -> Vec<BookLevel> {
        levels.iter().map(|&(p, q)| BookLevel::new(p, q)).collect()
    }

    #[test]
    fn test_partial_fill_at_second_level() {
        let asks = book(&[(dec!(100), dec!(1)), (dec!(110), dec!(1000))]);
        let fill = walk(&asks, dec!(100000)).unwrap();

        let expected_partial =
            (dec!(99900) / dec!(110)).round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero);
        assert_eq!(fill.price, dec!(110));
        assert_eq!(fill.quantity, dec!(1) + expected_partial);
        assert!(fill.cost <= dec!(100000));
    }

    #[test]
    fn test_partial_fill_at_first_level() {
        let asks = book(&[(dec!(200000), dec!(5))]);
        let fill = walk(&asks, dec!(100000)).unwrap();

        assert_eq!(fill.price, dec!(200000));
        assert_eq!(fill.quantity, dec!(0.5));
        assert_eq!(fill.cost, dec!(100000));
    }

    #[test]
    fn test_exhausted_book_is_insufficient_liquidity() {
        let asks = book(&[(dec!(100), dec!(1)), (dec!(110), dec!(2))]);

        match walk(&asks, dec!(100000)) {
            Err(GridBotError::InsufficientLiquidity { budget, remaining }) => {
                assert_eq!(budget, dec!(100000));
                assert_eq!(remaining, dec!(99680));
            }
            other => panic!("expected insufficient liquidity, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_budget_consumes_level_and_continues() {
        let asks = book(&[(dec!(100), dec!(1)), (dec!(200), dec!(1))]);
        let fill = walk(&asks, dec!(150)).unwrap();

        assert_eq!(fill.price, dec!(200));
        assert_eq!(fill.quantity, dec!(1.25));
        assert_eq!(fill.cost, dec!(150));
    }

    #[test]
    fn test_empty_book() {
        assert!(walk(&[], dec!(1000)).is_err());
    }

    #[test]
    fn test_never_overspends() {
        let asks = book(&[
            (dec!(3000001), dec!(0.0123)),
            (dec!(3000007), dec!(0.5)),
            (dec!(3000013), dec!(2)),
        ]);
        for budget in [dec!(1), dec!(333.33), dec!(37000), dec!(1234567.89)] {
            let fill = walk(&asks, budget).unwrap();
            assert!(fill.cost <= budget, "cost {} > budget {}", fill.cost, budget);
        }
    }

    #[test]
    fn test_quantity_monotonic_in_budget() {
        let asks = book(&[(dec!(100), dec!(2)), (dec!(105), dec!(3)), (dec!(120), dec!(100))]);
        let mut previous = Decimal::ZERO;
        let mut budget = dec!(10);
        while budget < dec!(5000) {
            let fill = walk(&asks, budget).unwrap();
            assert!(fill.quantity >= previous);
            previous = fill.quantity;
            budget += dec!(37.5);
        }
    }
}
