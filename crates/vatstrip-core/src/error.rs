//! Error types for the vatstrip-core library.

use thiserror::Error;

/// Main error type for the vatstrip library.
#[derive(Error, Debug)]
pub enum VatstripError {
    /// Document or drawing backend error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Tax-rate detection error.
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Numeric parsing error.
    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by document sources and drawing backends.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Underlying file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF structure could not be read or written.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Page layout data is malformed.
    #[error("invalid layout: {0}")]
    Layout(String),

    /// Requested page does not exist.
    #[error("invalid page index: {0}")]
    InvalidPage(usize),

    /// The backend cannot render one of the glyphs in the text.
    #[error("cannot render {text:?}: {reason}")]
    GlyphRender { text: String, reason: String },
}

/// Errors related to tax-rate detection.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// No plausible rate was found anywhere in the document text.
    #[error("no plausible tax rate found in document")]
    RateNotDetected,

    /// A configured rate pattern does not compile.
    #[error("invalid rate pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors from locale-aware number parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    /// The string is not a valid decimal after normalisation.
    #[error("not a valid locale number: {value:?}")]
    Parse { value: String },
}

/// Result type for the vatstrip library.
pub type Result<T> = std::result::Result<T, VatstripError>;
