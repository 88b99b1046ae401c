use super::DocumentRenderer;
use crate::error::RenderError;

/// Writes the markup itself as the output document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownDocumentRenderer;

impl DocumentRenderer for MarkdownDocumentRenderer {
    fn render(&self, markup: &str) -> Result<Vec<u8>, RenderError> {
        Ok(markup.as_bytes().to_vec())
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}
