//! # Money Helpers
//!
//! All currency amounts in the system are `rust_decimal::Decimal`. Uploaded
//! sales files carry decimal unit prices and occasionally decimal quantities,
//! so integer minor units are not an option here; exact decimal arithmetic
//! with one explicit rounding rule is.
//!
//! ## The Rounding Rule
//! Every currency output is rounded to 2 decimal places using
//! round-half-away-from-zero, and the rounding is applied at each aggregation
//! step rather than only at display time. Many small sales summed before
//! rounding would otherwise accumulate representation drift between the
//! dashboard and the per-product views.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a currency amount to 2 decimal places, half away from zero.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
/// use kios_core::money::round_currency;
///
/// let x = Decimal::from_str("10.005").unwrap();
/// assert_eq!(round_currency(x), Decimal::from_str("10.01").unwrap());
/// ```
#[inline]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_currency_half_away_from_zero() {
        assert_eq!(round_currency(dec("1.005")), dec("1.01"));
        assert_eq!(round_currency(dec("1.004")), dec("1.00"));
        assert_eq!(round_currency(dec("-1.005")), dec("-1.01"));
        assert_eq!(round_currency(dec("2.675")), dec("2.68"));
    }

    #[test]
    fn test_round_currency_noop_on_exact() {
        assert_eq!(round_currency(dec("27000")), dec("27000"));
        assert_eq!(round_currency(dec("1500.50")), dec("1500.50"));
    }
}
