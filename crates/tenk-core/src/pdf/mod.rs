//! PDF text acquisition.

mod extractor;

pub use extractor::PdfTextExtractor;

use std::path::Path;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Source of raw document text for the pipeline.
pub trait TextExtractor: Send + Sync {
    /// Return the full text of the document at `path`.
    fn extract(&self, path: &Path) -> Result<String>;
}
