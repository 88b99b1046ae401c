//! Batch processing command for a directory of annual reports.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use tenk_core::{discover_inputs, BatchReport};

use super::{build_pipeline, load_config, DocumentFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob patterns (default: every report in the input directory)
    inputs: Vec<String>,

    /// Directory scanned for reports
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each report
    #[arg(short, long, value_enum)]
    format: Option<DocumentFormat>,

    /// Also write a summary CSV to the output directory
    #[arg(long)]
    summary: bool,

    /// Exit with an error if any document fails
    #[arg(long)]
    strict: bool,

    /// API key for the completion service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// One row of summary.csv.
#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    status: &'a str,
    company_name: &'a str,
    output: String,
    error: String,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    if let Some(format) = args.format {
        config.render.format = format.into();
    }
    let input_dir = args.input_dir.clone().unwrap_or_else(|| config.paths.input_dir.clone());
    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.paths.output_dir.clone());

    let files = if args.inputs.is_empty() {
        if !input_dir.is_dir() {
            anyhow::bail!("Input directory not found: {}", input_dir.display());
        }
        discover_inputs(&input_dir, &config.paths.extensions)?
    } else {
        expand_patterns(&args.inputs, &config.paths.extensions)?
    };

    if files.is_empty() {
        println!("{} No documents to process", style("ℹ").blue());
        return Ok(());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pipeline = build_pipeline(&config, args.api_key.clone(), &output_dir)?;
    std::fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let report = pipeline
        .run_with_progress(&files, |path, result| {
            if let Err(e) = result {
                pb.println(format!("{} {}: {}", style("✗").red(), path.display(), e));
            }
            pb.inc(1);
        })
        .await;

    pb.finish_and_clear();

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.total(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(report.processed_count()).green(),
        style(report.failure_count()).red()
    );

    if !report.is_success() {
        println!();
        println!("{}", style("Failed files:").red());
        for failed in &report.failed {
            println!("  - {}: {}", failed.input.display(), failed.error);
        }

        if args.strict {
            anyhow::bail!("{} of {} documents failed", report.failure_count(), report.total());
        }
    }

    Ok(())
}

fn expand_patterns(patterns: &[String], extensions: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        for entry in glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() && has_extension(&path, extensions) => files.push(path),
                Ok(path) => debug!("Skipping {}", path.display()),
                Err(e) => warn!("Cannot read {}: {}", e.path().display(), e),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for doc in &report.succeeded {
        wtr.serialize(SummaryRow {
            filename: file_name(&doc.input),
            status: "success",
            company_name: &doc.company_name,
            output: doc.output.display().to_string(),
            error: String::new(),
        })?;
    }

    for failed in &report.failed {
        wtr.serialize(SummaryRow {
            filename: file_name(&failed.input),
            status: "error",
            company_name: "",
            output: String::new(),
            error: failed.error.to_string(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenk_core::pipeline::{FailedDocument, ProcessedDocument};
    use tenk_core::{ExtractionError, PipelineError};

    #[test]
    fn test_has_extension() {
        let exts = vec!["pdf".to_string()];
        assert!(has_extension(Path::new("a/report.PDF"), &exts));
        assert!(!has_extension(Path::new("a/report.txt"), &exts));
        assert!(!has_extension(Path::new("a/report"), &exts));
    }

    #[test]
    fn test_expand_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pattern = dir.path().join("*").display().to_string();

        let files = expand_patterns(&[pattern.clone(), pattern], &["pdf".to_string()]).unwrap();
        assert_eq!(files, vec![dir.path().join("a.pdf"), dir.path().join("b.pdf")]);
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let report = BatchReport {
            succeeded: vec![ProcessedDocument {
                input: PathBuf::from("in/apple.pdf"),
                output: PathBuf::from("out/annual_report_apple_inc_10k.pdf"),
                company_name: "Apple Inc.".to_string(),
            }],
            failed: vec![FailedDocument {
                input: PathBuf::from("in/broken.pdf"),
                error: PipelineError::Extraction(ExtractionError::SchemaViolation(
                    "missing field `company_name`".to_string(),
                )),
            }],
        };

        write_summary(&path, &report).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "filename,status,company_name,output,error");
        assert!(lines[1].starts_with("apple.pdf,success,Apple Inc.,"));
        assert!(lines[2].starts_with("broken.pdf,error,,,"));
        assert!(lines[2].contains("schema violation"));
    }
}
