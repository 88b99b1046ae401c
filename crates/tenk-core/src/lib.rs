//! Core library for schema-constrained 10-K annual report extraction.
//!
//! This crate provides:
//! - PDF text extraction
//! - The annual report data model and the JSON Schema derived from it
//! - Prompt assembly and structured completion through Gemini
//! - Report rendering to Markdown and PDF
//! - A sequential batch pipeline

pub mod error;
pub mod extraction;
pub mod models;
pub mod naming;
pub mod pdf;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod schema;

pub use error::{ExtractionError, PdfError, PipelineError, RenderError, Result, ServiceError, TenkError};
pub use extraction::{ExtractionClient, GeminiService, MockCompletionService, RetryPolicy, StructuredCompletionService};
pub use models::config::{ReportFormat, TenkConfig};
pub use models::report::AnnualReport;
pub use pdf::{PdfTextExtractor, TextExtractor};
pub use pipeline::{discover_inputs, BatchReport, FailedDocument, Pipeline, ProcessedDocument};
pub use prompt::PromptBuilder;
pub use render::{DocumentRenderer, MarkdownDocumentRenderer, PdfDocumentRenderer, ReportRenderer};
pub use schema::{ExtractionSchema, FieldKind, FieldSpec};
