//! Error types for the tenk-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the tenk library.
#[derive(Error, Debug)]
pub enum TenkError {
    /// PDF text extraction error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Structured extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Report rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Per-document pipeline error.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to reading text out of PDF files.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to read the file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Failures of the external structured-completion service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Connection-level failure (DNS, TLS, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The service rejected the call because of rate limiting.
    #[error("rate limited by completion service")]
    RateLimited,

    /// The service is temporarily unavailable (5xx).
    #[error("service unavailable (HTTP {status}): {body}")]
    Unavailable { status: u16, body: String },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered but produced no candidate text.
    #[error("completion service returned no content")]
    EmptyResponse,

    /// The response envelope itself (not the payload) could not be decoded.
    #[error("invalid response envelope: {0}")]
    InvalidEnvelope(String),

    /// The document is longer than the configured limit.
    #[error("document too large: {len} chars (max: {max})")]
    InputTooLarge { len: usize, max: usize },

    /// No API key was configured.
    #[error("missing API key (set {0})")]
    MissingApiKey(String),
}

impl ServiceError {
    /// Whether a fresh attempt has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Transport(_)
                | ServiceError::Timeout
                | ServiceError::RateLimited
                | ServiceError::Unavailable { .. }
        )
    }
}

/// Errors from turning document text into an [`AnnualReport`](crate::AnnualReport).
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The completion service could not be used.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// The returned payload does not conform to the extraction schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl ExtractionError {
    /// Whether this error may go away on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::Service(e) => e.is_retryable(),
            ExtractionError::SchemaViolation(_) => false,
        }
    }
}

/// Errors produced by a [`DocumentRenderer`](crate::render::DocumentRenderer).
#[derive(Error, Debug)]
pub enum RenderError {
    /// Building or serializing the PDF failed.
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// Failure of a single document inside a batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading text from the input failed.
    #[error("text extraction failed: {0}")]
    Pdf(#[from] PdfError),

    /// The model output could not be obtained or validated.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// The report could not be rendered.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// Writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the tenk library.
pub type Result<T> = std::result::Result<T, TenkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ServiceError::Timeout.is_retryable());
        assert!(ServiceError::Transport("reset".into()).is_retryable());
        assert!(!ServiceError::EmptyResponse.is_retryable());
        assert!(!ServiceError::MissingApiKey("GEMINI_API_KEY".into()).is_retryable());

        let err: ExtractionError = ServiceError::RateLimited.into();
        assert!(err.is_retryable());
        assert!(!ExtractionError::SchemaViolation("x".into()).is_retryable());
    }

    #[test]
    fn test_conversions_keep_messages() {
        let err: PipelineError = ExtractionError::SchemaViolation("missing field `filing_date`".into()).into();
        assert_eq!(err.to_string(), "schema violation: missing field `filing_date`");

        let err: TenkError = err.into();
        assert!(err.to_string().contains("filing_date"));

        let err: TenkError = PdfError::NoPages.into();
        assert_eq!(err.to_string(), "PDF error: PDF has no pages");
    }
}
