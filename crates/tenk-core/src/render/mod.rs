//! Report rendering: annual report → Markdown markup → output document.

pub mod format;
mod markdown;
mod pdf;

pub use format::FieldFormat;
pub use markdown::MarkdownDocumentRenderer;
pub use pdf::PdfDocumentRenderer;

use std::borrow::Cow;

use serde_json::Value;
use tracing::warn;

use crate::error::RenderError;
use crate::models::config::{RenderConfig, ReportFormat};
use crate::models::report::AnnualReport;

/// Converts Markdown markup into final document bytes.
pub trait DocumentRenderer: Send + Sync {
    /// Render `markup` into a document.
    fn render(&self, markup: &str) -> Result<Vec<u8>, RenderError>;

    /// File extension of produced documents, without the dot.
    fn extension(&self) -> &'static str;
}

/// Maps one report field to a labelled display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRule {
    pub field: &'static str,
    pub label: &'static str,
    pub format: FieldFormat,
}

const fn rule(field: &'static str, label: &'static str, format: FieldFormat) -> DisplayRule {
    DisplayRule { field, label, format }
}

/// Display order of the report body. Required fields belong to the header.
pub const DISPLAY_RULES: &[DisplayRule] = &[
    rule("business_description", "Business Description", FieldFormat::Text),
    rule("auditor", "Auditor", FieldFormat::Text),
    rule("total_revenue", "Total Revenue", FieldFormat::Currency),
    rule("total_liabilities", "Total Liabilities", FieldFormat::Currency),
    rule("total_equity", "Total Equity", FieldFormat::Currency),
    rule("total_employees", "Total Employees", FieldFormat::Count),
    rule("retained_earnings", "Retained Earnings", FieldFormat::Currency),
    rule("net_debt", "Net Debt", FieldFormat::Currency),
    rule("goodwill", "Goodwill", FieldFormat::Currency),
    rule("gross_margin", "Gross Margin", FieldFormat::Percent),
    rule("operating_income", "Operating Income", FieldFormat::Currency),
    rule("net_income", "Net Income", FieldFormat::Currency),
    rule("ebitda", "EBITDA", FieldFormat::Currency),
    rule("cash_from_operations", "Cash from Operations", FieldFormat::Currency),
    rule("cash_from_investing", "Cash from Investing", FieldFormat::Currency),
    rule("cash_from_financing", "Cash from Financing", FieldFormat::Currency),
    rule("free_cash_flow_per_share", "Free Cash Flow per Share", FieldFormat::Currency),
    rule("risk_factors", "Risk Factors", FieldFormat::List),
];

/// A labelled, formatted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub label: &'static str,
    pub value: String,
}

/// Turns an [`AnnualReport`] into a human-readable document.
pub struct ReportRenderer {
    renderer: Box<dyn DocumentRenderer>,
    currency_symbol: String,
}

impl ReportRenderer {
    /// Create a renderer producing documents with `renderer`.
    pub fn new(renderer: Box<dyn DocumentRenderer>) -> Self {
        Self {
            renderer,
            currency_symbol: "$".to_string(),
        }
    }

    /// Create a renderer for the configured output format.
    pub fn from_config(config: &RenderConfig) -> Self {
        let renderer: Box<dyn DocumentRenderer> = match config.format {
            ReportFormat::Pdf => Box::new(PdfDocumentRenderer::from_config(config)),
            ReportFormat::Markdown => Box::new(MarkdownDocumentRenderer),
        };
        Self::new(renderer).with_currency_symbol(&config.currency_symbol)
    }

    /// Set the symbol placed before currency amounts.
    pub fn with_currency_symbol(mut self, symbol: &str) -> Self {
        self.currency_symbol = symbol.to_string();
        self
    }

    /// Extension of rendered documents.
    pub fn extension(&self) -> &'static str {
        self.renderer.extension()
    }

    /// Formatted lines for every present field, in display order.
    ///
    /// NaN and infinities project to JSON `null`, so they are shown as raw
    /// text here instead of vanishing as absent.
    pub fn display_lines(&self, report: &AnnualReport) -> Vec<DisplayLine> {
        let projection = match serde_json::to_value(report) {
            Ok(projection) => projection,
            Err(e) => {
                warn!("Could not project report for '{}': {}", report.company_name, e);
                return Vec::new();
            }
        };
        let non_finite = report.non_finite_fields();

        DISPLAY_RULES
            .iter()
            .filter_map(|rule| match non_finite.iter().find(|(field, _)| *field == rule.field) {
                Some((field, value)) => {
                    warn!("Cannot format '{}' (non-finite number), showing raw value", field);
                    Some(DisplayLine {
                        label: rule.label,
                        value: value.to_string(),
                    })
                }
                None => self.display_line(rule, &projection),
            })
            .collect()
    }

    /// Formatted lines for a JSON projection of a report.
    ///
    /// Rules whose field is missing are skipped. A value that cannot be
    /// formatted is shown as its raw JSON text.
    pub fn display_lines_from_value(&self, projection: &Value) -> Vec<DisplayLine> {
        DISPLAY_RULES
            .iter()
            .filter_map(|rule| self.display_line(rule, projection))
            .collect()
    }

    fn display_line(&self, rule: &DisplayRule, projection: &Value) -> Option<DisplayLine> {
        let value = projection.get(rule.field)?;
        let text = match format::format_value(value, rule.format, &self.currency_symbol) {
            Ok(text) => text?,
            Err(e) => {
                warn!("Cannot format '{}' ({}), showing raw value", rule.field, e);
                value.to_string()
            }
        };
        Some(DisplayLine {
            label: rule.label,
            value: text,
        })
    }

    /// Markdown markup: the header (title and filing date) followed by one
    /// bullet per display line.
    ///
    /// Line breaks inside values are folded into spaces so every value stays
    /// inside its own heading or bullet.
    pub fn to_markup(&self, report: &AnnualReport) -> String {
        let mut markup = format!(
            "# Annual Report: {}\n\n**Filing Date:** {}\n",
            single_line(&report.company_name),
            report.filing_date.format("%Y-%m-%d")
        );

        let lines = self.display_lines(report);
        if !lines.is_empty() {
            markup.push('\n');
            for line in &lines {
                markup.push_str(&format!("- **{}:** {}\n", line.label, single_line(&line.value)));
            }
        }
        markup
    }

    /// Render `report` into document bytes.
    pub fn render(&self, report: &AnnualReport) -> Result<Vec<u8>, RenderError> {
        self.renderer.render(&self.to_markup(report))
    }
}

/// Join the non-blank lines of `text` with single spaces.
fn single_line(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r']) {
        return Cow::Borrowed(text);
    }
    let joined = text
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Cow::Owned(joined)
}
