//! PDF text extraction using lopdf and pdf-extract.

use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use super::{Result, TextExtractor};
use crate::error::PdfError;

/// Extracts embedded text from PDF files.
///
/// Whole-document extraction with pdf-extract is tried first. If that fails or
/// yields nothing, text is pulled page by page with lopdf, and a page that
/// cannot be read contributes empty text. Panics inside either library are
/// caught and treated like extraction errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract text from PDF bytes.
    pub fn extract_from_bytes(&self, data: &[u8]) -> Result<String> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw: Cow<'_, [u8]> = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            Cow::Owned(decrypted)
        } else {
            Cow::Borrowed(data)
        };

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }
        debug!("Loaded PDF with {} pages", pages.len());

        match catch_panic(|| pdf_extract::extract_text_from_mem(&raw)) {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!("Extracted {} chars with pdf-extract", text.len());
                return Ok(text);
            }
            Ok(Ok(_)) => debug!("pdf-extract returned no text, extracting per page"),
            Ok(Err(e)) => debug!("pdf-extract failed ({}), extracting per page", e),
            Err(msg) => warn!("pdf-extract panicked ({}), extracting per page", msg),
        }

        let mut full_text = String::new();
        for page_num in pages.keys() {
            let page_text = match catch_panic(|| doc.extract_text(&[*page_num])) {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!("Could not read text of page {}: {}", page_num, e);
                    String::new()
                }
                Err(msg) => {
                    warn!("Reading text of page {} panicked: {}", page_num, msg);
                    String::new()
                }
            };

            if !page_text.trim().is_empty() {
                if !full_text.is_empty() {
                    full_text.push_str("\n\n");
                }
                full_text.push_str(&page_text);
            }
        }

        if full_text.is_empty() {
            warn!("No extractable text found; the PDF may be a scanned image");
        }
        Ok(full_text)
    }
}

/// Run `f`, turning a panic into its message.
fn catch_panic<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let data = std::fs::read(path).map_err(|source| PdfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract_from_bytes(&data)
    }
}
