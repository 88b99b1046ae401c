//! Structured extraction: prompt → completion service → validated report.

mod client;
mod gemini;
mod mock;

pub use client::{parse_report, ExtractionClient, RetryPolicy};
pub use gemini::GeminiService;
pub use mock::MockCompletionService;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::schema::ExtractionSchema;

/// A generative model endpoint that can be constrained to a declared output shape.
///
/// Implementations return the raw response text. Callers treat it as untrusted
/// and validate it against the schema.
#[async_trait]
pub trait StructuredCompletionService: Send + Sync {
    /// Run one completion for `prompt`, constrained to `schema`.
    async fn complete(&self, prompt: &str, schema: &ExtractionSchema) -> Result<String, ServiceError>;

    /// Short identifier for logs.
    fn name(&self) -> &str {
        "completion-service"
    }
}

#[async_trait]
impl<T: StructuredCompletionService + ?Sized> StructuredCompletionService for Box<T> {
    async fn complete(&self, prompt: &str, schema: &ExtractionSchema) -> Result<String, ServiceError> {
        (**self).complete(prompt, schema).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
