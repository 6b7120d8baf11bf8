//! Fixed grammars and rate-specific regex builders.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    // Locale price: 1-3 digits, optional ".ddd" groups, then ",dd".
    pub static ref PRICE_GRAMMAR: Regex = Regex::new(
        r"\d{1,3}(?:\.\d{3})*,\d{2}"
    ).unwrap();

    // Full dates like 27.10.2025
    pub static ref DATE_GRAMMAR: Regex = Regex::new(
        r"\d{2}\.\d{2}\.\d{4}"
    ).unwrap();

    // "dd." immediately before a match, which makes the match the tail of "dd.dd,dd"
    pub static ref SHORT_DATE_HEAD: Regex = Regex::new(
        r"(\d{2})\.$"
    ).unwrap();

    // Numeral following a tax label, e.g. "240,31" in "VAT: 240,31"
    pub static ref AMOUNT_NUMERAL: Regex = Regex::new(
        r"\d[\d.,]*\d"
    ).unwrap();
}

/// Regex fragment matching `rate` as printed: "8,10", "8.1", "19", "19,00".
pub fn rate_fragment(rate: Decimal) -> String {
    let normalized = rate.normalize();
    let integer = normalized.trunc();
    let fraction = (normalized - integer).abs();

    let integer_digits = integer.abs().to_string();
    if fraction.is_zero() {
        format!(r"\b{}(?:[.,]0+)?", integer_digits)
    } else {
        // "0.1" -> "1"
        let fraction_string = fraction.to_string();
        let fraction_digits = fraction_string.trim_start_matches("0.");
        format!(r"\b{}[.,]{}0*", integer_digits, fraction_digits)
    }
}

/// Alternation of the configured tax keywords.
pub fn keyword_alternation(keywords: &[String]) -> String {
    let escaped: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    format!("(?:{})", escaped.join("|"))
}

/// The detected rate, a percent sign and a tax keyword, possibly across lines.
pub fn rate_label_regex(rate: Decimal, keywords: &[String]) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?is){}\s*%.*?{}",
        rate_fragment(rate),
        keyword_alternation(keywords)
    ))
}

/// "(rate % KEYWORD: amount)" with the amount in group 1.
pub fn tax_amount_regex(rate: Decimal, keywords: &[String]) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)\(?{}\s*%\s*{}[:\s]*(\d[\d.,]*\d)",
        rate_fragment(rate),
        keyword_alternation(keywords)
    ))
}

/// The rate numeral on its own, used to check label surroundings.
///
/// The numeral must end there: "8,1" does not match inside "8,15" and "19"
/// does not match inside "19,5".
pub fn rate_regex(rate: Decimal) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"{}(?:[^\d.,]|[.,]\D|[.,]$|$)", rate_fragment(rate)))
}
