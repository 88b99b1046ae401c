//! Process command - extract a single annual report.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use tenk_core::models::config::ReportFormat;
use tenk_core::pipeline::write_atomic;

use super::{build_pipeline, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input annual report (PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: the report name in the output directory; stdout for json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: render.format from the configuration)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// API key for the completion service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Rendered PDF report
    Pdf,
    /// Markdown report
    Markdown,
    /// Extracted fields as JSON
    Json,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let format = resolve_format(args.format, config.render.format);
    match format {
        OutputFormat::Pdf => config.render.format = ReportFormat::Pdf,
        OutputFormat::Markdown => config.render.format = ReportFormat::Markdown,
        OutputFormat::Json => {}
    }

    info!("Processing file: {}", args.input.display());
    let pipeline = build_pipeline(&config, args.api_key.clone(), &config.paths.output_dir)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Extracting {}", args.input.display()));

    let result = pipeline.extract_report(&args.input).await;
    pb.finish_and_clear();
    let report = result?;

    println!(
        "{} Extracted report for {} (filed {})",
        style("✓").green(),
        style(&report.company_name).bold(),
        report.filing_date
    );

    if let OutputFormat::Json = format {
        let json = serde_json::to_string_pretty(&report)?;
        match &args.output {
            Some(path) => {
                write_atomic(path, json.as_bytes())?;
                println!("{} Output written to {}", style("✓").green(), path.display());
            }
            None => println!("{}", json),
        }
    } else {
        let bytes = pipeline.renderer().render(&report)?;
        let output_path = args
            .output
            .clone()
            .unwrap_or_else(|| pipeline.output_path_for(&report.company_name));
        write_atomic(&output_path, &bytes)?;
        println!("{} Saved to {}", style("✓").green(), output_path.display());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// The requested format, or the configured document format when none was given.
fn resolve_format(requested: Option<OutputFormat>, configured: ReportFormat) -> OutputFormat {
    requested.unwrap_or(match configured {
        ReportFormat::Pdf => OutputFormat::Pdf,
        ReportFormat::Markdown => OutputFormat::Markdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_format_used_without_flag() {
        assert_eq!(resolve_format(None, ReportFormat::Markdown), OutputFormat::Markdown);
        assert_eq!(resolve_format(None, ReportFormat::Pdf), OutputFormat::Pdf);
    }

    #[test]
    fn test_flag_overrides_configured_format() {
        assert_eq!(resolve_format(Some(OutputFormat::Pdf), ReportFormat::Markdown), OutputFormat::Pdf);
        assert_eq!(resolve_format(Some(OutputFormat::Json), ReportFormat::Pdf), OutputFormat::Json);
    }
}
