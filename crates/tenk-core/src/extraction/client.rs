//! Extraction client: calls the completion service and checks the response shape.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::StructuredCompletionService;
use crate::error::{ExtractionError, ServiceError};
use crate::models::config::ModelConfig;
use crate::models::report::AnnualReport;
use crate::prompt::PromptBuilder;
use crate::schema::ExtractionSchema;

/// Bounded retry with exponential backoff for retryable service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Retry up to `max_retries` times starting at `base_delay`.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Turns document text into a schema-conforming [`AnnualReport`].
pub struct ExtractionClient<S> {
    service: S,
    schema: ExtractionSchema,
    prompt_builder: PromptBuilder,
    retry: RetryPolicy,
    max_document_chars: usize,
}

impl<S: StructuredCompletionService> ExtractionClient<S> {
    /// Create a client for the annual report schema. Single attempt, no length limit.
    pub fn new(service: S) -> Self {
        let schema = ExtractionSchema::for_annual_report();
        let prompt_builder = PromptBuilder::new(&schema);

        Self {
            service,
            schema,
            prompt_builder,
            retry: RetryPolicy::none(),
            max_document_chars: 0,
        }
    }

    /// Create a client using the retry and length settings from `config`.
    pub fn from_config(service: S, config: &ModelConfig) -> Self {
        Self::new(service)
            .with_retry_policy(RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ))
            .with_max_document_chars(config.max_document_chars)
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reject documents longer than `max` characters (0 = unlimited).
    pub fn with_max_document_chars(mut self, max: usize) -> Self {
        self.max_document_chars = max;
        self
    }

    /// The contract responses are checked against.
    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// The underlying completion service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Extract an annual report from raw document text.
    ///
    /// Fails with [`ExtractionError::Service`] when the service cannot be used and
    /// with [`ExtractionError::SchemaViolation`] when its answer does not fit the
    /// schema. A partially valid answer is never returned.
    pub async fn extract(&self, document_text: &str) -> Result<AnnualReport, ExtractionError> {
        if self.max_document_chars > 0 {
            let len = document_text.chars().count();
            if len > self.max_document_chars {
                return Err(ServiceError::InputTooLarge {
                    len,
                    max: self.max_document_chars,
                }
                .into());
            }
        }

        let prompt = self.prompt_builder.build(document_text);
        debug!("Prompt length: {} chars", prompt.len());

        let response = self.complete_with_retry(&prompt).await?;
        debug!("Response length: {} chars", response.len());

        let report = parse_report(&response)?;
        info!(
            "Extracted report for '{}' ({} optional fields present)",
            report.company_name,
            report.present_fields().len()
        );
        Ok(report)
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String, ServiceError> {
        let mut retry = 0;
        loop {
            match self.service.complete(prompt, &self.schema).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        self.service.name(),
                        e,
                        retry + 1,
                        self.retry.max_retries,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse and type-check a raw service response.
pub fn parse_report(response: &str) -> Result<AnnualReport, ExtractionError> {
    let json_str = strip_code_fence(response);

    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        ExtractionError::SchemaViolation(format!("response is not valid JSON: {}", e))
    })?;

    if !value.is_object() {
        return Err(ExtractionError::SchemaViolation(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    let report: AnnualReport = serde_json::from_value(value)
        .map_err(|e| ExtractionError::SchemaViolation(e.to_string()))?;

    if report.company_name.trim().is_empty() {
        return Err(ExtractionError::SchemaViolation(
            "company_name must not be empty".to_string(),
        ));
    }

    Ok(report)
}

/// Models sometimes wrap JSON in a Markdown code block even in JSON mode.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
