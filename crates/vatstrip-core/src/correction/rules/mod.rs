//! Rule-based detectors used by the correction engine.

pub mod anchor;
pub mod numeric;
pub mod patterns;
pub mod prices;
pub mod rate;
pub mod tax_line;

pub use anchor::GeometryAnchor;
pub use numeric::{format_locale_grouped, format_locale_price, parse_decimal_numeral, parse_locale_price, remove_tax, round_money};
pub use prices::{PriceMatch, PriceTokenExtractor};
pub use rate::RateDetector;
pub use tax_line::TaxLineClassifier;

/// Trait for text field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the preferred occurrence from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Text around the byte range `start..end`, at most `radius` characters on each side.
///
/// Returns the part before the range and the part after it.
pub(crate) fn char_window(text: &str, start: usize, end: usize, radius: usize) -> (&str, &str) {
    let before_start = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let before = if radius == 0 { "" } else { &text[before_start..start] };

    let after_end = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    let after = &text[end..after_end];

    (before, after)
}
