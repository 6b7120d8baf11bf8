//! Interfaces to the text-extraction and drawing backends.

mod layout;

pub use layout::{LayoutBlock, LayoutDocument, LayoutLine, LayoutPage};

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::geometry::{Point, Rect};
use crate::models::plan::Rgb;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Type of a text-extraction block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Plain text.
    #[default]
    Text,
    /// Embedded image.
    Image,
    /// Vector drawing.
    Drawing,
}

impl BlockKind {
    pub fn is_text(&self) -> bool {
        matches!(self, BlockKind::Text)
    }
}

/// A block of text as reported by the extraction backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub rect: Rect,
    pub kind: BlockKind,
}

/// Read-only view of a document supplied by the text-extraction backend.
///
/// Pages are zero-indexed. Search is an exact, case-sensitive substring
/// search returning one rectangle per visual occurrence.
pub trait DocumentSource {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Full text of a page.
    fn page_text(&self, page: usize) -> Result<String>;

    /// Text blocks of a page, in extraction order.
    fn page_text_blocks(&self, page: usize) -> Result<Vec<TextBlock>>;

    /// Rectangles of every occurrence of `literal` on a page.
    fn search_text(&self, page: usize, literal: &str) -> Result<Vec<Rect>>;

    /// Text confined to `clip` on a page.
    fn search_text_in_region(&self, page: usize, clip: Rect) -> Result<String>;

    /// Text of all pages joined by newlines.
    fn full_text(&self) -> Result<String> {
        let mut text = String::new();
        for page in 0..self.page_count() {
            if page > 0 {
                text.push('\n');
            }
            text.push_str(&self.page_text(page)?);
        }
        Ok(text)
    }
}

/// Drawing primitives consumed when applying an edit plan.
pub trait DrawingBackend {
    /// Paint a filled rectangle.
    fn draw_rect(&mut self, page: usize, rect: Rect, fill: Rgb) -> Result<()>;

    /// Draw text with its baseline starting at `position`.
    ///
    /// Returns [`BackendError::GlyphRender`] when a character cannot be drawn.
    fn insert_text(&mut self, page: usize, position: Point, text: &str, font_size: f32) -> Result<()>;
}
