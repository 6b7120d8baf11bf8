//! Edit plan handed to the drawing backend, and the per-document summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// RGB colour with components in 0.0 - 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
    pub const LIGHT_YELLOW: Rgb = Rgb(1.0, 1.0, 0.85);
}

/// Fill used for highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    /// Light yellow, old figures stay faintly visible for manual review.
    #[default]
    Review,
    /// Opaque white, old figures disappear.
    Download,
}

impl HighlightStyle {
    pub fn fill(&self) -> Rgb {
        match self {
            Self::Review => Rgb::LIGHT_YELLOW,
            Self::Download => Rgb::WHITE,
        }
    }
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Opaque filled rectangle.
    Highlight { page: usize, rect: Rect, fill: Rgb },
    /// Text drawn with its baseline at `position`.
    TextOverlay {
        page: usize,
        position: Point,
        text: String,
        font_size: f32,
    },
}

impl EditOp {
    pub fn page(&self) -> usize {
        match self {
            Self::Highlight { page, .. } | Self::TextOverlay { page, .. } => *page,
        }
    }

    pub fn is_highlight(&self) -> bool {
        matches!(self, Self::Highlight { .. })
    }
}

/// Two-layer edit plan: every highlight is painted before any overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlan {
    pub highlights: Vec<EditOp>,
    pub overlays: Vec<EditOp>,
}

impl OverlayPlan {
    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty() && self.overlays.is_empty()
    }

    pub fn len(&self) -> usize {
        self.highlights.len() + self.overlays.len()
    }

    /// Operations in application order.
    pub fn ops(&self) -> impl Iterator<Item = &EditOp> {
        self.highlights.iter().chain(self.overlays.iter())
    }
}

/// Summary reported to the caller once a document is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSummary {
    pub detected_rate_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    pub price_count: usize,
    /// Sum of all tax-inclusive amounts found.
    pub prior_total: Decimal,
    /// Sum of the same amounts with tax removed.
    pub corrected_total: Decimal,
    /// Tax amount printed next to the tax label, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,
}
