//! Core library for removing sales tax from invoice prices.
//!
//! This crate provides:
//! - Tax-rate detection from free text with a configurable pattern table
//! - Locale-aware price extraction with false-positive suppression
//! - Tax-line classification and a two-layer highlight/overlay edit plan
//! - A JSON page-layout backend and lopdf / pdf-extract PDF backends

pub mod correction;
pub mod document;
pub mod error;
pub mod models;
pub mod pdf;

pub use correction::{
    ApplyReport, CorrectionEngine, CorrectionReport, CorrectionWarning, OverlayPlanner,
};
pub use correction::rules::{
    FieldExtractor, GeometryAnchor, PriceTokenExtractor, RateDetector, TaxLineClassifier,
};
pub use document::{BlockKind, DocumentSource, DrawingBackend, LayoutDocument, TextBlock};
pub use error::{BackendError, DetectionError, NumericError, Result, VatstripError};
pub use models::config::VatstripConfig;
pub use models::plan::{CorrectionSummary, EditOp, HighlightStyle, OverlayPlan, Rgb};
pub use models::token::{ClassifiedToken, PriceToken, RateCandidate, TaxAmountHint};
pub use pdf::{PdfCanvas, PdfTextReader};
