//! In-memory page layout model, loadable from JSON.
//!
//! The layout holds lines with their bounding rectangles. Character
//! positions inside a line are approximated by an even advance across the
//! line width, which is what text search and region clipping work from.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BlockKind, DocumentSource, Result, TextBlock};
use crate::error::BackendError;
use crate::models::geometry::{Point, Rect};

/// A document made of pre-extracted page layouts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub pages: Vec<LayoutPage>,
}

/// One page of a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub blocks: Vec<LayoutBlock>,
}

/// A block of lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBlock {
    #[serde(default)]
    pub kind: BlockKind,
    pub rect: Rect,
    #[serde(default)]
    pub lines: Vec<LayoutLine>,
}

/// A single line of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutLine {
    pub text: String,
    pub rect: Rect,
}

impl LayoutLine {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }

    /// A line starting at `origin` (top-left) with a fixed character advance.
    pub fn at(text: impl Into<String>, origin: Point, char_width: f32, line_height: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * char_width;
        let rect = Rect::new(origin.x, origin.y, origin.x + width, origin.y + line_height);
        Self { text, rect }
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Horizontal position of the boundary before character `index`.
    fn char_x(&self, index: usize) -> f32 {
        let count = self.char_count();
        if count == 0 {
            return self.rect.x0;
        }
        self.rect.x0 + self.rect.width() * index as f32 / count as f32
    }

    fn char_rect(&self, index: usize) -> Rect {
        Rect::new(self.char_x(index), self.rect.y0, self.char_x(index + 1), self.rect.y1)
    }

    fn occurrences(&self, literal: &str) -> Vec<Rect> {
        self.text
            .match_indices(literal)
            .map(|(byte_start, found)| {
                let start = self.text[..byte_start].chars().count();
                let end = start + found.chars().count();
                Rect::new(self.char_x(start), self.rect.y0, self.char_x(end), self.rect.y1)
            })
            .collect()
    }

    fn clipped_text(&self, clip: &Rect) -> String {
        self.text
            .chars()
            .enumerate()
            .filter(|(i, _)| clip.contains_point(self.char_rect(*i).center()))
            .map(|(_, c)| c)
            .collect()
    }
}

impl LayoutBlock {
    /// A text block covering the given lines.
    pub fn text(lines: Vec<LayoutLine>) -> Self {
        let rect = lines
            .iter()
            .map(|l| l.rect)
            .reduce(|a, b| {
                Rect::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
            })
            .unwrap_or_default();
        Self {
            kind: BlockKind::Text,
            rect,
            lines,
        }
    }

    /// A block holding a single line.
    pub fn line(text: impl Into<String>, origin: Point, char_width: f32, line_height: f32) -> Self {
        Self::text(vec![LayoutLine::at(text, origin, char_width, line_height)])
    }

    /// An image block, which carries no text.
    pub fn image(rect: Rect) -> Self {
        Self {
            kind: BlockKind::Image,
            rect,
            lines: Vec::new(),
        }
    }

    /// Lines joined with newlines.
    pub fn joined_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl LayoutPage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: LayoutBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Blocks that carry searchable text.
    fn text_blocks(&self) -> impl Iterator<Item = &LayoutBlock> {
        self.blocks.iter().filter(|b| b.kind.is_text())
    }

    fn lines(&self) -> impl Iterator<Item = &LayoutLine> {
        self.text_blocks().flat_map(|b| b.lines.iter())
    }
}

impl LayoutDocument {
    pub fn new(pages: Vec<LayoutPage>) -> Self {
        Self { pages }
    }

    /// Parse a layout from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(json).map_err(|e| BackendError::Layout(e.to_string()))?;
        debug!("Loaded layout with {} pages", document.pages.len());
        Ok(document)
    }

    /// Load a layout from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize the layout to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BackendError::Layout(e.to_string()))
    }

    fn page(&self, page: usize) -> Result<&LayoutPage> {
        self.pages.get(page).ok_or(BackendError::InvalidPage(page))
    }
}

impl DocumentSource for LayoutDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String> {
        let page = self.page(page)?;
        Ok(page
            .text_blocks()
            .filter(|b| !b.lines.is_empty())
            .map(|b| b.joined_text())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn page_text_blocks(&self, page: usize) -> Result<Vec<TextBlock>> {
        let page = self.page(page)?;
        Ok(page
            .blocks
            .iter()
            .map(|b| TextBlock {
                text: b.joined_text(),
                rect: b.rect,
                kind: b.kind,
            })
            .collect())
    }

    fn search_text(&self, page: usize, literal: &str) -> Result<Vec<Rect>> {
        let page = self.page(page)?;
        if literal.is_empty() {
            return Ok(Vec::new());
        }
        Ok(page.lines().flat_map(|l| l.occurrences(literal)).collect())
    }

    fn search_text_in_region(&self, page: usize, clip: Rect) -> Result<String> {
        let page = self.page(page)?;
        Ok(page
            .lines()
            .filter(|l| l.rect.intersects(&clip))
            .map(|l| l.clipped_text(&clip))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
