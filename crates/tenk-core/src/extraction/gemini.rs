//! Gemini `generateContent` integration with a response schema constraint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::StructuredCompletionService;
use crate::error::ServiceError;
use crate::models::config::ModelConfig;
use crate::schema::ExtractionSchema;

/// Structured completion through the Google Generative Language API.
pub struct GeminiService {
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_json_schema: &'a Value,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiService {
    /// Create a service for `model` with the given API key and default settings.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ServiceError> {
        let config = ModelConfig {
            name: model.into(),
            ..ModelConfig::default()
        };
        Self::with_config(&config, api_key)
    }

    /// Create a service from configuration and an explicit API key.
    pub fn with_config(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, ServiceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ServiceError::MissingApiKey(config.api_key_env.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            api_key,
            temperature: config.temperature,
            client,
        })
    }

    /// Create a service from configuration, taking the key from `api_key` or
    /// from the environment variable named in the config.
    pub fn from_config(config: &ModelConfig, api_key: Option<String>) -> Result<Self, ServiceError> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .ok_or_else(|| ServiceError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_config(config, key)
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl StructuredCompletionService for GeminiService {
    async fn complete(&self, prompt: &str, schema: &ExtractionSchema) -> Result<String, ServiceError> {
        let schema_json = schema.to_json_schema();
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: &schema_json,
                temperature: self.temperature,
            },
        };

        debug!("POST {} (model {})", self.url(), self.model);
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status.as_u16(), body));
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidEnvelope(e.to_string()))?;

        candidate_text(envelope)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn map_transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Transport(e.to_string())
    }
}

fn map_status(status: u16, body: String) -> ServiceError {
    match status {
        429 => ServiceError::RateLimited,
        500..=599 => ServiceError::Unavailable { status, body },
        _ => ServiceError::Http { status, body },
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(envelope: GenerateContentResponse) -> Result<String, ServiceError> {
    let Some(candidate) = envelope.candidates.into_iter().next() else {
        return Err(ServiceError::EmptyResponse);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        debug!("Empty candidate, finish reason: {:?}", candidate.finish_reason);
        return Err(ServiceError::EmptyResponse);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(429, String::new()), ServiceError::RateLimited));
        assert!(matches!(
            map_status(503, "busy".to_string()),
            ServiceError::Unavailable { status: 503, .. }
        ));
        assert!(matches!(
            map_status(400, "bad".to_string()),
            ServiceError::Http { status: 400, .. }
        ));
        assert!(map_status(500, String::new()).is_retryable());
        assert!(!map_status(403, String::new()).is_retryable());
    }

    #[test]
    fn test_request_body_shape() {
        let schema = json!({"type": "object"});
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: &schema,
                temperature: 0.0,
            },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseJsonSchema"]["type"], "object");
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let envelope: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 10}
        }))
        .unwrap();

        assert_eq!(candidate_text(envelope).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_no_candidates_is_empty_response() {
        let envelope: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(candidate_text(envelope), Err(ServiceError::EmptyResponse)));

        let envelope: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]})).unwrap();
        assert!(matches!(candidate_text(envelope), Err(ServiceError::EmptyResponse)));
    }

    #[test]
    fn test_missing_api_key() {
        let config = ModelConfig {
            api_key_env: "TENK_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..ModelConfig::default()
        };
        let err = GeminiService::from_config(&config, None).err().unwrap();
        assert!(matches!(err, ServiceError::MissingApiKey(ref var) if var == "TENK_TEST_KEY_THAT_IS_NOT_SET"));

        assert!(GeminiService::with_config(&config, "  ").is_err());
    }

    #[test]
    fn test_url_uses_model_and_trims_endpoint() {
        let config = ModelConfig {
            endpoint: "http://localhost:8080/".to_string(),
            ..ModelConfig::default()
        };
        let service = GeminiService::with_config(&config, "key").unwrap();
        assert_eq!(
            service.url(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(service.model(), "gemini-2.0-flash");
    }
}
