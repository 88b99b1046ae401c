//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod schema;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use tenk_core::models::config::{ReportFormat, TenkConfig};
use tenk_core::{ExtractionClient, GeminiService, PdfTextExtractor, Pipeline, ReportRenderer};

/// Rendered document format selectable on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum DocumentFormat {
    /// Paginated PDF
    Pdf,
    /// Markdown markup
    Markdown,
}

impl From<DocumentFormat> for ReportFormat {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Pdf => ReportFormat::Pdf,
            DocumentFormat::Markdown => ReportFormat::Markdown,
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tenk")
        .join("config.json")
}

/// Load the configuration from `config_path`, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TenkConfig> {
    let config = match config_path {
        Some(path) => TenkConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                TenkConfig::from_file(&default_path)
                    .with_context(|| format!("Failed to load config from {}", default_path.display()))?
            } else {
                TenkConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Build a Gemini-backed pipeline writing to `output_dir`.
pub fn build_pipeline(
    config: &TenkConfig,
    api_key: Option<String>,
    output_dir: &Path,
) -> anyhow::Result<Pipeline<GeminiService>> {
    let service = GeminiService::from_config(&config.model, api_key)?;
    debug!("Using model {}", service.model());

    let client = ExtractionClient::from_config(service, &config.model);
    let renderer = ReportRenderer::from_config(&config.render);

    Ok(Pipeline::new(
        Box::new(PdfTextExtractor::new()),
        client,
        renderer,
        output_dir,
    ))
}
