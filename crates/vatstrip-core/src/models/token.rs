//! Values derived from document text while processing one invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// A tax-rate match found in the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCandidate {
    /// Percentage value, e.g. 8.10.
    pub value: Decimal,
    /// Priority rank of the pattern that produced the match.
    pub source_pattern_rank: u32,
    /// Jurisdiction tag of that pattern.
    pub jurisdiction: String,
    /// Whether the pattern puts the rate directly next to the tax keyword.
    pub canonical: bool,
    /// Byte offset of the match in the document text.
    pub position: usize,
    /// Text surrounding the match.
    pub context_snippet: String,
}

/// A monetary amount located on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceToken {
    /// Zero-based page index.
    pub page: usize,
    /// Amount as printed, e.g. "1.540,00".
    pub raw_text: String,
    /// Parsed amount.
    pub numeric_value: Decimal,
    /// Left edge on the text baseline.
    pub anchor_baseline: Point,
    /// Bounding rectangle of this visual occurrence.
    pub bounding_rect: Rect,
}

/// The absolute tax amount printed next to the tax label, e.g. "(8,10 % VAT: 240,31)".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAmountHint {
    pub page: usize,
    pub value: Decimal,
    /// Amount as printed.
    pub raw_text: String,
    /// Every occurrence of the printed amount on that page.
    pub rects: Vec<Rect>,
}

impl TaxAmountHint {
    /// Whether the token shows this tax amount.
    pub fn matches(&self, token: &PriceToken, tolerance: Decimal) -> bool {
        self.page == token.page && (self.value - token.numeric_value).abs() <= tolerance
    }
}

/// A price token together with its tax-line classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedToken {
    pub token: PriceToken,
    /// True when the token is the tax amount itself (highlight only).
    pub is_tax_amount_line: bool,
}
