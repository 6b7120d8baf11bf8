//! PDF backends built on lopdf and pdf-extract.

mod canvas;
mod text;

pub use canvas::PdfCanvas;
pub use text::PdfTextReader;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::BackendError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Load a document, decrypting it when it only carries an empty password.
///
/// Returns the document and the bytes of its unencrypted form.
fn load_document(data: &[u8]) -> Result<(Document, Vec<u8>)> {
    let mut doc = Document::load_mem(data).map_err(|e| BackendError::Pdf(e.to_string()))?;

    let raw = if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|_| BackendError::Pdf("document is encrypted".to_string()))?;
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| BackendError::Pdf(format!("failed to save decrypted PDF: {}", e)))?;
        decrypted
    } else {
        data.to_vec()
    };

    if doc.get_pages().is_empty() {
        return Err(BackendError::Pdf("document has no pages".to_string()));
    }

    debug!("Loaded PDF with {} pages", doc.get_pages().len());
    Ok((doc, raw))
}

/// Look up an inheritable page attribute, walking up the page tree.
fn inherited_attribute(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Object> {
    let dict = doc.get_dictionary(node_id).ok()?;

    if let Ok(value) = dict.get(key) {
        if let Ok((_, resolved)) = doc.dereference(value) {
            return Some(resolved.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => inherited_attribute(doc, *parent_id, key),
        _ => None,
    }
}

/// Resources dictionary of a page, following inheritance.
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use lopdf::{Document, Object, Stream, dictionary};

    /// A single empty A4 page with its MediaBox inherited from the page tree.
    pub(crate) fn create_test_pdf() -> Vec<u8> {
        build_test_pdf(None)
    }

    /// Like [`create_test_pdf`], with `content` as the page content stream.
    pub(crate) fn create_test_pdf_with_content(content: &[u8]) -> Vec<u8> {
        build_test_pdf(Some(content))
    }

    fn build_test_pdf(content: Option<&[u8]>) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
        });
        if let Some(content) = content {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            if let Ok(page) = doc.get_object_mut(page_id) {
                if let Ok(dict) = page.as_dict_mut() {
                    dict.set("Contents", Object::Reference(content_id));
                }
            }
        }
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        if let Ok(page) = doc.get_object_mut(page_id) {
            if let Ok(dict) = page.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_load_document() {
        let (doc, raw) = super::load_document(&create_test_pdf()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(raw.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_load_garbage() {
        assert!(super::load_document(b"not a pdf").is_err());
    }

    #[test]
    fn test_inherited_media_box() {
        let (doc, _) = super::load_document(&create_test_pdf()).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let media_box = super::inherited_attribute(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);
    }
}
