//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TenkError};

/// Main configuration for the tenk pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenkConfig {
    /// Structured completion model configuration.
    pub model: ModelConfig,

    /// Input and output locations.
    pub paths: PathsConfig,

    /// Report rendering configuration.
    pub render: RenderConfig,
}

/// Generative model and service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier passed to the service.
    pub name: String,

    /// Base URL of the Generative Language API.
    pub endpoint: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after a retryable service failure (0 = single attempt).
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    pub retry_base_delay_ms: u64,

    /// Maximum document length in characters (0 = unlimited).
    pub max_document_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            max_document_chars: 0,
        }
    }
}

/// Where reports are read from and written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for input documents.
    pub input_dir: PathBuf,

    /// Directory receiving rendered reports.
    pub output_dir: PathBuf,

    /// Recognised input file extensions (case-insensitive, without dot).
    pub extensions: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("reports/ready_to_read"),
            output_dir: PathBuf::from("reports/completed_report"),
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Paginated PDF document.
    #[default]
    Pdf,
    /// The Markdown markup itself.
    Markdown,
}

/// Report rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Symbol placed before currency amounts.
    pub currency_symbol: String,

    /// Output document format.
    pub format: ReportFormat,

    /// Body font size in points.
    pub font_size: f32,

    /// Title font size in points.
    pub title_font_size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            format: ReportFormat::Pdf,
            font_size: 11.0,
            title_font_size: 20.0,
        }
    }
}

impl TenkConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(TenkError::Config)
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.model.name.trim().is_empty() {
            return Err("model.name must not be empty".to_string());
        }
        if self.model.endpoint.trim().is_empty() {
            return Err("model.endpoint must not be empty".to_string());
        }
        if self.model.timeout_secs == 0 {
            return Err("model.timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(format!(
                "model.temperature {} out of range [0.0, 2.0]",
                self.model.temperature
            ));
        }
        if self.paths.extensions.is_empty() {
            return Err("paths.extensions must list at least one extension".to_string());
        }
        if self.render.font_size <= 0.0 || self.render.title_font_size <= 0.0 {
            return Err("render font sizes must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TenkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: TenkConfig =
            serde_json::from_str(r#"{"model": {"name": "gemini-2.5-pro"}}"#).unwrap();

        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.model.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.paths, PathsConfig::default());
        assert_eq!(config.render.format, ReportFormat::Pdf);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = TenkConfig::default();
        config.render.format = ReportFormat::Markdown;
        config.model.max_retries = 0;
        config.save(&path).unwrap();

        assert_eq!(TenkConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = TenkConfig::default();
        config.model.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TenkConfig::default();
        config.paths.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = TenkConfig::default();
        config.model.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ReportFormat::Markdown).unwrap(), "\"markdown\"");
    }
}
