//! Locale-tolerant number parsing.
//!
//! Marketplace exports write prices the Indonesian way: `.` as the thousands
//! separator and `,` as the decimal mark (`27.000,5` = 27000.5). Some files
//! use plain ASCII numbers instead. The rule that disambiguates:
//!
//! - a comma is present: dots are separators, the comma is the decimal point
//! - no comma: dots are separators, full stop
//!
//! `27.000` is therefore twenty-seven thousand, never 27.0.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a locale-formatted number, returning 0 for anything unparseable.
///
/// Zero rather than an error because the callers treat a missing/garbled
/// price or quantity as "not supplied" and reject the row with their own
/// message (which names the row number, which this function does not know).
pub fn parse_locale_number(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    let normalized: String = if trimmed.contains(',') {
        trimmed
            .chars()
            .filter(|c| *c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect()
    } else {
        trimmed.chars().filter(|c| *c != '.').collect()
    };

    // Strip currency symbols and stray spaces, keep sign and digits.
    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_dot_as_thousands_separator() {
        assert_eq!(parse_locale_number("27.000"), dec("27000"));
        assert_eq!(parse_locale_number("1.250.000"), dec("1250000"));
    }

    #[test]
    fn test_comma_as_decimal_mark() {
        assert_eq!(parse_locale_number("27.000,5"), dec("27000.5"));
        assert_eq!(parse_locale_number("1,5"), dec("1.5"));
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_locale_number("1500"), dec("1500"));
        assert_eq!(parse_locale_number("0"), dec("0"));
        assert_eq!(parse_locale_number("-3"), dec("-3"));
    }

    #[test]
    fn test_currency_noise_stripped() {
        assert_eq!(parse_locale_number("Rp 27.000"), dec("27000"));
        assert_eq!(parse_locale_number(" 1,5 "), dec("1.5"));
    }

    #[test]
    fn test_garbage_becomes_zero() {
        assert_eq!(parse_locale_number(""), Decimal::ZERO);
        assert_eq!(parse_locale_number("abc"), Decimal::ZERO);
        assert_eq!(parse_locale_number("-"), Decimal::ZERO);
    }
}
