//! Plain-text extraction from PDF files.

use std::path::Path;

use super::{Result, load_document};
use crate::error::BackendError;

/// Reads the text layer of a PDF with pdf-extract.
///
/// There is no geometry, so this reader serves rate detection only.
pub struct PdfTextReader {
    raw_data: Vec<u8>,
    page_count: usize,
}

impl PdfTextReader {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (doc, raw_data) = load_document(data)?;
        Ok(Self {
            raw_data,
            page_count: doc.get_pages().len(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Text of the whole document.
    pub fn text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| BackendError::Pdf(e.to_string()))
    }
}
