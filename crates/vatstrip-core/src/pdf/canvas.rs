//! Drawing backend that writes into PDF page content streams.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use super::{Result, inherited_attribute, load_document, page_resources};
use crate::document::DrawingBackend;
use crate::error::BackendError;
use crate::models::geometry::{Point, Rect};
use crate::models::plan::Rgb;

const FONT_NAME: &str = "VsHelv";

/// Collects drawing operations per page and writes them on save.
///
/// Coordinates are layout coordinates (origin top-left, y down) and are
/// flipped against each page's MediaBox.
pub struct PdfCanvas {
    document: Document,
    pages: Vec<ObjectId>,
    pending: BTreeMap<usize, Vec<Operation>>,
}

impl PdfCanvas {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (document, _) = load_document(data)?;
        let pages = document.get_pages().into_values().collect();
        Ok(Self {
            document,
            pages,
            pending: BTreeMap::new(),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write pending operations and save to `path`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.flush()?;
        self.document
            .save(path)
            .map_err(|e| BackendError::Pdf(e.to_string()))?;
        debug!("Saved PDF to {}", path.display());
        Ok(())
    }

    /// Write pending operations and return the document bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush()?;
        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|e| BackendError::Pdf(e.to_string()))?;
        Ok(buffer)
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.pages.get(page).copied().ok_or(BackendError::InvalidPage(page))
    }

    /// MediaBox as (llx, lly, urx, ury).
    fn media_box(&self, page: usize) -> Result<(f32, f32, f32, f32)> {
        let page_id = self.page_id(page)?;
        let values = match inherited_attribute(&self.document, page_id, b"MediaBox") {
            Some(Object::Array(values)) if values.len() == 4 => values,
            _ => return Err(BackendError::Pdf(format!("page {} has no MediaBox", page))),
        };

        let mut numbers = [0.0f32; 4];
        for (slot, value) in numbers.iter_mut().zip(values.iter()) {
            *slot = value
                .as_float()
                .or_else(|_| value.as_i64().map(|i| i as f32))
                .map_err(|e| BackendError::Pdf(e.to_string()))?;
        }
        Ok((numbers[0], numbers[1], numbers[2], numbers[3]))
    }

    fn push(&mut self, page: usize, operations: Vec<Operation>) {
        self.pending.entry(page).or_default().extend(operations);
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let font_id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        for (page, operations) in std::mem::take(&mut self.pending) {
            let page_id = self.page_id(page)?;
            let count = operations.len();
            self.attach_font(page_id, font_id)?;
            self.append_content(page_id, operations)?;
            debug!("Wrote {} operations to page {}", count, page);
        }
        Ok(())
    }

    /// Give the page its own Resources with the overlay font added.
    fn attach_font(&mut self, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
        let mut resources = page_resources(&self.document, page_id);
        let mut fonts = match resources.get(b"Font") {
            Ok(font) => match self.document.dereference(font) {
                Ok((_, Object::Dictionary(dict))) => dict.clone(),
                _ => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };
        fonts.set(FONT_NAME, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let page = self
            .document
            .get_dictionary_mut(page_id)
            .map_err(|e| BackendError::Pdf(e.to_string()))?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Wrap the existing content in q/Q and append ours after it.
    fn append_content(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> Result<()> {
        // Readers concatenate the streams of a page, so every stream is
        // delimited by newlines; the original content may end mid-token.
        let encode = |operations: Vec<Operation>| {
            let body = Content { operations }
                .encode()
                .map_err(|e| BackendError::Pdf(e.to_string()))?;
            let mut stream = Vec::with_capacity(body.len() + 2);
            stream.push(b'\n');
            stream.extend(body);
            stream.push(b'\n');
            Ok::<_, BackendError>(stream)
        };
        let save_state = encode(vec![Operation::new("q", vec![])])?;
        let restore_state = encode(vec![Operation::new("Q", vec![])])?;
        let ours = encode(operations)?;

        let save_id = self.document.add_object(Stream::new(Dictionary::new(), save_state));
        let restore_id = self.document.add_object(Stream::new(Dictionary::new(), restore_state));
        let ours_id = self.document.add_object(Stream::new(Dictionary::new(), ours));

        let page = self
            .document
            .get_dictionary_mut(page_id)
            .map_err(|e| BackendError::Pdf(e.to_string()))?;
        let existing = match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 3);
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(restore_id));
        contents.push(Object::Reference(ours_id));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

/// Encode text for the WinAnsi Helvetica font.
///
/// Only ASCII and the Latin-1 range are accepted.
fn encode_win_ansi(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => Ok(c as u32 as u8),
            _ => Err(BackendError::GlyphRender {
                text: text.to_string(),
                reason: format!("no glyph for {:?} in Helvetica", c),
            }),
        })
        .collect()
}

impl DrawingBackend for PdfCanvas {
    fn draw_rect(&mut self, page: usize, rect: Rect, fill: Rgb) -> Result<()> {
        let (llx, _, _, ury) = self.media_box(page)?;
        let x = llx + rect.x0;
        let y = ury - rect.y1;

        self.push(
            page,
            vec![
                Operation::new("q", vec![]),
                Operation::new("rg", vec![fill.0.into(), fill.1.into(), fill.2.into()]),
                Operation::new("re", vec![x.into(), y.into(), rect.width().into(), rect.height().into()]),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        );
        Ok(())
    }

    fn insert_text(&mut self, page: usize, position: Point, text: &str, font_size: f32) -> Result<()> {
        let encoded = encode_win_ansi(text)?;
        let (llx, _, _, ury) = self.media_box(page)?;
        let x = llx + position.x;
        let y = ury - position.y;

        self.push(
            page,
            vec![
                Operation::new("q", vec![]),
                Operation::new("rg", vec![0.0f32.into(), 0.0f32.into(), 0.0f32.into()]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(FONT_NAME.as_bytes().to_vec()), font_size.into()]),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        );
        Ok(())
    }
}
