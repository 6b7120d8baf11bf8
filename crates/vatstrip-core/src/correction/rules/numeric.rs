//! Locale-aware number handling for the "1.234,56" convention.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::NumericError;

/// Parse an amount written with `.` thousands separators and a `,` decimal point.
///
/// "1.540,00" -> 1540.00, "240,31" -> 240.31.
pub fn parse_locale_price(raw: &str) -> Result<Decimal, NumericError> {
    let normalized = raw.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return Err(NumericError::Parse {
            value: raw.to_string(),
        });
    }
    Decimal::from_str(&normalized).map_err(|_| NumericError::Parse {
        value: raw.to_string(),
    })
}

/// Format an amount with two decimals and a `,` decimal point, no grouping.
///
/// 1424.606 -> "1424,61".
pub fn format_locale_price(value: Decimal) -> String {
    format!("{:.2}", round_money(value)).replace('.', ",")
}

/// Format an amount with `.` thousands grouping, e.g. 2742.55 -> "2.742,55".
pub fn format_locale_grouped(value: Decimal) -> String {
    let plain = format!("{:.2}", round_money(value));
    let (sign, plain) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", plain),
    };
    let (integer_part, decimal_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    format!("{}{},{}", sign, grouped, decimal_part)
}

/// Parse a short numeral where either `,` or `.` may be the decimal point.
///
/// Used for rates ("8,10", "8.10", "19"). When both separators occur the
/// locale convention applies.
pub fn parse_decimal_numeral(raw: &str) -> Result<Decimal, NumericError> {
    let trimmed = raw.trim();
    if trimmed.contains(',') && trimmed.contains('.') {
        return parse_locale_price(trimmed);
    }
    Decimal::from_str(&trimmed.replace(',', ".")).map_err(|_| NumericError::Parse {
        value: raw.to_string(),
    })
}

/// Round to cents, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Remove `rate_percent` of tax from a tax-inclusive amount, rounded to cents.
pub fn remove_tax(gross: Decimal, rate_percent: Decimal) -> Decimal {
    let divisor = Decimal::ONE + rate_percent / Decimal::ONE_HUNDRED;
    if divisor.is_zero() {
        return round_money(gross);
    }
    round_money(gross / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_locale_price() {
        assert_eq!(parse_locale_price("1.540,00").unwrap(), d("1540.00"));
        assert_eq!(parse_locale_price("240,31").unwrap(), d("240.31"));
        assert_eq!(parse_locale_price("12.345.678,90").unwrap(), d("12345678.90"));
        assert_eq!(parse_locale_price("99").unwrap(), d("99"));
    }

    #[test]
    fn test_parse_locale_price_rejects_garbage() {
        assert!(parse_locale_price("").is_err());
        assert!(parse_locale_price("12,3,4").is_err());
        assert!(parse_locale_price("EUR 12,00").is_err());
    }

    #[test]
    fn test_format_locale_price() {
        assert_eq!(format_locale_price(d("1424.61")), "1424,61");
        assert_eq!(format_locale_price(d("1424.606845")), "1424,61");
        assert_eq!(format_locale_price(d("5")), "5,00");
    }

    #[test]
    fn test_format_locale_grouped() {
        assert_eq!(format_locale_grouped(d("2742.55")), "2.742,55");
        assert_eq!(format_locale_grouped(d("12345678.9")), "12.345.678,90");
        assert_eq!(format_locale_grouped(d("240.31")), "240,31");
    }

    #[test]
    fn test_round_trip_two_decimals() {
        for raw in ["0.00", "0.01", "10.50", "99.99", "1424.61", "100000.00", "12345.67"] {
            let value = d(raw);
            assert_eq!(parse_locale_price(&format_locale_price(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_parse_decimal_numeral() {
        assert_eq!(parse_decimal_numeral("8,10").unwrap(), d("8.10"));
        assert_eq!(parse_decimal_numeral("8.10").unwrap(), d("8.10"));
        assert_eq!(parse_decimal_numeral("19").unwrap(), d("19"));
        assert!(parse_decimal_numeral("x").is_err());
    }

    #[test]
    fn test_remove_tax() {
        assert_eq!(remove_tax(d("1540.00"), d("8.10")), d("1424.61"));
        assert_eq!(remove_tax(d("119.00"), d("19")), d("100.00"));
        assert_eq!(remove_tax(d("250.00"), d("0")), d("250.00"));
    }

    #[test]
    fn test_remove_tax_is_deterministic() {
        let first = remove_tax(d("2964.70"), d("8.1"));
        let second = remove_tax(d("2964.70"), d("8.1"));
        assert_eq!(first, second);
        assert_eq!(first, d("2742.55"));
    }
}
