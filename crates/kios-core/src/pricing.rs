//! # Point-in-Time Cost Lookup
//!
//! Sales arrive in bulk uploads, out of chronological order, and each one
//! must be costed with the price that was effective on *that* sale's date.
//! Using today's cost price would silently rewrite historical profit every
//! time the owner updates a price.
//!
//! ## Lookup Rule
//! ```text
//! history:   ──T1────────T2────────T3──────────►  (cost entries)
//!
//! cost_at(T)      T<T1 ──────────► T1's price (oldest fallback)
//!                 T1 ≤ T < T2 ───► T1's price
//!                 T2 ≤ T < T3 ───► T2's price
//!                 T ≥ T3 ────────► T3's price
//!                 empty history ─► product's current cost price (may be 0)
//! ```
//!
//! The companion write operation (`ProductRepository::record_cost` in
//! kios-db) appends an entry and sets the product's current cost price to the
//! new value unconditionally — last write wins for the "current" field even
//! when the entry is backdated. That matches the stored data this system
//! inherits; `cost_at` is the one place that interprets the timeline
//! chronologically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::PriceEntry;

/// Returns the cost price in effect at `instant`.
///
/// ## Arguments
/// * `history` - the product's cost timeline, in any order
/// * `current_price` - the product's current cost price (empty-history fallback)
/// * `instant` - the moment to evaluate, typically a sale's `recorded_at`
pub fn cost_at(history: &[PriceEntry], current_price: Decimal, instant: DateTime<Utc>) -> Decimal {
    if history.is_empty() {
        return current_price;
    }

    // Newest first, then take the first entry already in effect.
    let mut sorted: Vec<&PriceEntry> = history.iter().collect();
    sorted.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

    for entry in &sorted {
        if entry.recorded_at <= instant {
            return entry.price;
        }
    }

    // Instant predates the whole timeline: the oldest known price is the
    // best available estimate.
    sorted
        .last()
        .map(|entry| entry.price)
        .unwrap_or(current_price)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn entry(price: i64, at: &str) -> PriceEntry {
        PriceEntry {
            price: Decimal::from(price),
            recorded_at: ts(at),
        }
    }

    fn sample_history() -> Vec<PriceEntry> {
        vec![
            entry(1000, "2025-01-01 00:00"),
            entry(1200, "2025-03-01 00:00"),
            entry(1500, "2025-06-01 00:00"),
        ]
    }

    #[test]
    fn test_cost_between_entries_uses_earlier_entry() {
        let history = sample_history();
        let cost = cost_at(&history, Decimal::ZERO, ts("2025-02-10 12:00"));
        assert_eq!(cost, Decimal::from(1000));

        let cost = cost_at(&history, Decimal::ZERO, ts("2025-04-15 08:30"));
        assert_eq!(cost, Decimal::from(1200));
    }

    #[test]
    fn test_cost_before_all_entries_falls_back_to_oldest() {
        let history = sample_history();
        let cost = cost_at(&history, Decimal::ZERO, ts("2024-12-01 00:00"));
        assert_eq!(cost, Decimal::from(1000));
    }

    #[test]
    fn test_cost_at_or_after_latest_entry() {
        let history = sample_history();
        // Exactly at the boundary counts as in effect.
        let cost = cost_at(&history, Decimal::ZERO, ts("2025-06-01 00:00"));
        assert_eq!(cost, Decimal::from(1500));

        let cost = cost_at(&history, Decimal::ZERO, ts("2026-01-01 00:00"));
        assert_eq!(cost, Decimal::from(1500));
    }

    #[test]
    fn test_empty_history_returns_current_price() {
        let cost = cost_at(&[], Decimal::from(777), ts("2025-01-01 00:00"));
        assert_eq!(cost, Decimal::from(777));
    }

    #[test]
    fn test_unsorted_history_is_handled() {
        let mut history = sample_history();
        history.swap(0, 2);
        let cost = cost_at(&history, Decimal::ZERO, ts("2025-04-15 08:30"));
        assert_eq!(cost, Decimal::from(1200));
    }
}
