//! Batch driver: text → structured extraction → rendered report on disk.
//!
//! Documents are processed one at a time. A failing document is logged and
//! recorded in the [`BatchReport`]; it never stops the batch.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::extraction::{ExtractionClient, StructuredCompletionService};
use crate::models::report::AnnualReport;
use crate::naming::output_file_name;
use crate::pdf::TextExtractor;
use crate::render::ReportRenderer;

/// A document that produced a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    /// Input document.
    pub input: PathBuf,
    /// Written report.
    pub output: PathBuf,
    /// Company name as extracted.
    pub company_name: String,
}

/// A document that failed, with the reason.
#[derive(Debug)]
pub struct FailedDocument {
    /// Input document.
    pub input: PathBuf,
    /// What went wrong.
    pub error: PipelineError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ProcessedDocument>,
    pub failed: Vec<FailedDocument>,
}

impl BatchReport {
    /// Number of documents that produced a report.
    pub fn processed_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of documents that failed.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Number of documents attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when no document failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sequential extraction pipeline writing one report per document.
pub struct Pipeline<S> {
    extractor: Box<dyn TextExtractor>,
    client: ExtractionClient<S>,
    renderer: ReportRenderer,
    output_dir: PathBuf,
}

impl<S: StructuredCompletionService> Pipeline<S> {
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        client: ExtractionClient<S>,
        renderer: ReportRenderer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            client,
            renderer,
            output_dir: output_dir.into(),
        }
    }

    /// Directory receiving rendered reports.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The extraction client.
    pub fn client(&self) -> &ExtractionClient<S> {
        &self.client
    }

    /// The report renderer.
    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Where the report for `company_name` is written.
    pub fn output_path_for(&self, company_name: &str) -> PathBuf {
        self.output_dir
            .join(output_file_name(company_name, self.renderer.extension()))
    }

    /// Read the document and extract its report without rendering.
    pub async fn extract_report(&self, path: &Path) -> Result<AnnualReport, PipelineError> {
        let text = self.extractor.extract(path)?;
        debug!("{}: {} chars of text", path.display(), text.len());

        Ok(self.client.extract(&text).await?)
    }

    /// Extract, render and write the report for one document.
    pub async fn process_document(&self, path: &Path) -> Result<ProcessedDocument, PipelineError> {
        let report = self.extract_report(path).await?;
        let bytes = self.renderer.render(&report)?;

        let output = self.output_path_for(&report.company_name);
        write_atomic(&output, &bytes)?;
        info!("Saved report for '{}' to {}", report.company_name, output.display());

        Ok(ProcessedDocument {
            input: path.to_path_buf(),
            output,
            company_name: report.company_name,
        })
    }

    /// Process every input in order.
    pub async fn run(&self, inputs: &[PathBuf]) -> BatchReport {
        self.run_with_progress(inputs, |_, _| {}).await
    }

    /// Process every input in order, calling `on_done` after each document.
    pub async fn run_with_progress<F>(&self, inputs: &[PathBuf], mut on_done: F) -> BatchReport
    where
        F: FnMut(&Path, Result<&ProcessedDocument, &PipelineError>),
    {
        let mut report = BatchReport::default();
        let mut written: HashSet<PathBuf> = HashSet::new();

        for input in inputs {
            info!("Processing {}", input.display());

            match self.process_document(input).await {
                Ok(doc) => {
                    if !written.insert(doc.output.clone()) {
                        warn!(
                            "{} overwrote {} written earlier in this run",
                            input.display(),
                            doc.output.display()
                        );
                    }
                    on_done(input, Ok(&doc));
                    report.succeeded.push(doc);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", input.display(), e);
                    on_done(input, Err(&e));
                    report.failed.push(FailedDocument {
                        input: input.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            report.processed_count(),
            report.failure_count()
        );
        report
    }
}

/// List files in `dir` (non-recursive) whose extension is one of `extensions`,
/// compared case-insensitively, sorted by path.
pub fn discover_inputs(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });
        if matches {
            inputs.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }

    inputs.sort();
    Ok(inputs)
}

/// Write `bytes` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, PdfError};
    use crate::extraction::MockCompletionService;
    use crate::render::MarkdownDocumentRenderer;
    use std::collections::HashMap;

    /// Serves document text from memory, keyed by path.
    struct MemoryExtractor(HashMap<PathBuf, String>);

    impl TextExtractor for MemoryExtractor {
        fn extract(&self, path: &Path) -> crate::pdf::Result<String> {
            self.0.get(path).cloned().ok_or_else(|| PdfError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn pipeline(
        docs: &[(&str, &str)],
        service: MockCompletionService,
        output_dir: &Path,
    ) -> Pipeline<MockCompletionService> {
        let texts = docs
            .iter()
            .map(|(path, text)| (PathBuf::from(path), text.to_string()))
            .collect();
        Pipeline::new(
            Box::new(MemoryExtractor(texts)),
            ExtractionClient::new(service),
            ReportRenderer::new(Box::new(MarkdownDocumentRenderer)),
            output_dir,
        )
    }

    fn response(company: &str) -> String {
        format!(r#"{{"company_name": "{}", "filing_date": "2024-02-01", "net_income": 1500.0}}"#, company)
    }

    #[tokio::test]
    async fn test_batch_continues_after_schema_violation() {
        let out = tempfile::tempdir().unwrap();
        let service = MockCompletionService::default();
        service.add_response("ALPHA-TEXT", response("Alpha Corp"));
        service.add_response("BROKEN-TEXT", r#"{"auditor": "Nobody"}"#);
        service.add_response("GAMMA-TEXT", response("Gamma, Inc."));

        let pipeline = pipeline(
            &[("a.pdf", "ALPHA-TEXT"), ("b.pdf", "BROKEN-TEXT"), ("c.pdf", "GAMMA-TEXT")],
            service,
            out.path(),
        );
        let inputs: Vec<PathBuf> = ["a.pdf", "b.pdf", "c.pdf"].iter().map(PathBuf::from).collect();
        let report = pipeline.run(&inputs).await;

        assert_eq!(report.processed_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failed[0].input, PathBuf::from("b.pdf"));
        assert!(matches!(
            report.failed[0].error,
            PipelineError::Extraction(ExtractionError::SchemaViolation(_))
        ));

        let alpha = out.path().join("annual_report_alpha_corp_10k.md");
        let gamma = out.path().join("annual_report_gamma_inc_10k.md");
        assert!(alpha.exists());
        assert!(gamma.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 2);

        let content = std::fs::read_to_string(gamma).unwrap();
        assert!(content.starts_with("# Annual Report: Gamma, Inc.\n"));
        assert!(content.contains("- **Net Income:** $1,500.00"));
    }

    #[tokio::test]
    async fn test_text_failure_is_recorded() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            &[("a.pdf", "ALPHA-TEXT")],
            MockCompletionService::new(response("Alpha")),
            out.path(),
        );

        let inputs = vec![PathBuf::from("missing.pdf"), PathBuf::from("a.pdf")];
        let report = pipeline.run(&inputs).await;

        assert_eq!(report.processed_count(), 1);
        assert!(matches!(report.failed[0].error, PipelineError::Pdf(_)));
        assert_eq!(pipeline.client().service().call_count(), 1);
    }

    #[tokio::test]
    async fn test_name_collision_last_write_wins() {
        let out = tempfile::tempdir().unwrap();
        let service = MockCompletionService::default();
        service.add_response("FIRST", r#"{"company_name": "Acme, Inc.", "filing_date": "2023-02-01"}"#);
        service.add_response("SECOND", r#"{"company_name": "ACME INC.", "filing_date": "2024-02-01"}"#);

        let pipeline = pipeline(&[("1.pdf", "FIRST"), ("2.pdf", "SECOND")], service, out.path());
        let inputs = vec![PathBuf::from("1.pdf"), PathBuf::from("2.pdf")];
        let report = pipeline.run(&inputs).await;

        assert_eq!(report.processed_count(), 2);
        assert_eq!(report.succeeded[0].output, report.succeeded[1].output);

        let content = std::fs::read_to_string(&report.succeeded[1].output).unwrap();
        assert!(content.contains("2024-02-01"));
    }

    #[tokio::test]
    async fn test_company_name_with_separator_stays_in_output_dir() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            &[("att.pdf", "ATT-TEXT")],
            MockCompletionService::new(response("AT/T Holdings")),
            out.path(),
        );

        let report = pipeline.run(&[PathBuf::from("att.pdf")]).await;

        assert!(report.is_success());
        let output = &report.succeeded[0].output;
        assert_eq!(output.parent(), Some(out.path()));
        assert_eq!(output, &out.path().join("annual_report_at_t_holdings_10k.md"));
        assert!(output.is_file());
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_document() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            &[("a.pdf", "ALPHA-TEXT")],
            MockCompletionService::new(response("Alpha")),
            out.path(),
        );

        let mut seen = Vec::new();
        let inputs = vec![PathBuf::from("a.pdf"), PathBuf::from("nope.pdf")];
        pipeline
            .run_with_progress(&inputs, |path, result| seen.push((path.to_path_buf(), result.is_ok())))
            .await;

        assert_eq!(seen, vec![
            (PathBuf::from("a.pdf"), true),
            (PathBuf::from("nope.pdf"), false),
        ]);
    }

    #[test]
    fn test_discover_inputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let inputs = discover_inputs(dir.path(), &["pdf".to_string()]).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf", "c.pdf"]);

        let txt = discover_inputs(dir.path(), &[".TXT".to_string()]).unwrap();
        assert_eq!(txt.len(), 1);
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("report.md");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport::default();
        assert!(report.is_success());
        assert_eq!(report.total(), 0);
    }
}
