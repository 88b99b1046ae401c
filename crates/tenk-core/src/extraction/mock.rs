//! Deterministic completion service for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::StructuredCompletionService;
use crate::error::ServiceError;
use crate::schema::ExtractionSchema;

/// Returns pre-configured responses without any network calls.
///
/// Lookup order for each call:
/// 1. queued errors, oldest first
/// 2. the first registered response whose marker occurs in the prompt
/// 3. the default response
///
/// ```
/// use tenk_core::extraction::MockCompletionService;
///
/// let service = MockCompletionService::new(r#"{"company_name": "Acme", "filing_date": "2024-01-31"}"#);
/// service.add_response("Globex", r#"{"company_name": "Globex", "filing_date": "2024-03-01"}"#);
/// assert_eq!(service.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockCompletionService {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    errors: Arc<Mutex<VecDeque<ServiceError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockCompletionService {
    /// Create a mock returning `response` for every prompt.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `response` for prompts containing `marker`.
    pub fn add_response(&self, marker: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((marker.into(), response.into()));
    }

    /// Fail the next call with `error`. Errors queue up in push order.
    pub fn push_error(&self, error: ServiceError) {
        lock(&self.errors).push_back(error);
    }

    /// Number of times `complete` was called.
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl StructuredCompletionService for MockCompletionService {
    async fn complete(&self, prompt: &str, _schema: &ExtractionSchema) -> Result<String, ServiceError> {
        lock(&self.prompts).push(prompt.to_string());

        if let Some(error) = lock(&self.errors).pop_front() {
            return Err(error);
        }

        let response = lock(&self.responses)
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(response)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// A panicking test thread must not take the other calls down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
