//! Schema command - show what the model is asked to produce.

use std::path::PathBuf;

use clap::Args;
use console::style;

use tenk_core::{ExtractionSchema, PdfTextExtractor, PromptBuilder, TextExtractor};

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// List fields instead of printing the JSON Schema
    #[arg(long, conflicts_with = "prompt")]
    fields: bool,

    /// Print the full prompt that would be sent for this document
    #[arg(long, value_name = "FILE")]
    prompt: Option<PathBuf>,
}

pub async fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = ExtractionSchema::for_annual_report();

    if let Some(path) = &args.prompt {
        let text = PdfTextExtractor::new().extract(path)?;
        println!("{}", PromptBuilder::new(&schema).build(&text));
        return Ok(());
    }

    if args.fields {
        for field in schema.fields() {
            let marker = if field.required {
                style("required").yellow().to_string()
            } else {
                style("optional").dim().to_string()
            };
            println!(
                "{:<26} {:<11} {}  {}",
                field.name,
                format!("{:?}", field.kind),
                marker,
                field.description
            );
        }
        return Ok(());
    }

    println!("{}", schema.to_pretty_json());
    Ok(())
}
