//! Prompt assembly for annual report extraction.

use crate::schema::ExtractionSchema;

/// Builds the instruction payload for one document.
///
/// The schema is serialized once; [`build`](Self::build) is a pure function of
/// the document text. The text is embedded verbatim, with no cleanup and no
/// truncation.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema_json: String,
}

impl PromptBuilder {
    /// Create a builder for the given schema.
    pub fn new(schema: &ExtractionSchema) -> Self {
        Self {
            schema_json: schema.to_pretty_json(),
        }
    }

    /// Build the complete extraction prompt.
    pub fn build(&self, document_text: &str) -> String {
        let mut prompt = String::with_capacity(
            document_text.len() + self.schema_json.len() + EXTRACTION_INSTRUCTIONS.len() + 256,
        );

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Annual report text:\n");
        prompt.push_str("---\n");
        prompt.push_str(document_text);
        prompt.push_str("\n---\n\n");

        prompt.push_str("The output must match this JSON schema exactly:\n");
        prompt.push_str(&self.schema_json);
        prompt.push_str("\n\n");

        prompt.push_str(OUTPUT_RULES);
        prompt
    }
}

/// Build a prompt in one call.
pub fn build_prompt(document_text: &str, schema: &ExtractionSchema) -> String {
    PromptBuilder::new(schema).build(document_text)
}

const EXTRACTION_INSTRUCTIONS: &str =
    "Analyze the following annual report (10-K) and fill the data model based on it.";

const OUTPUT_RULES: &str = r#"Instructions:
- Carefully analyze all numerical values. Report monetary amounts in full USD, not in thousands or millions.
- Only include fields defined in the schema.
- If the report does not state a fact, omit the field. Never guess or fabricate a value.
- Use YYYY-MM-DD for dates.
- Respond only with a single valid JSON object, no markdown code blocks, no explanations."#;

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&ExtractionSchema::for_annual_report())
    }

    #[test]
    fn test_prompt_includes_text_verbatim() {
        let text = "TOTAL LIABILITIES308,030\nNet sales391,035  Apple Inc.";
        let prompt = builder().build(text);
        assert!(prompt.contains(text));
    }

    #[test]
    fn test_prompt_does_not_truncate() {
        let text = "x".repeat(500_000);
        let prompt = builder().build(&text);
        assert!(prompt.len() > text.len());
        assert!(prompt.contains(&text));
    }

    #[test]
    fn test_prompt_includes_schema() {
        let schema = ExtractionSchema::for_annual_report();
        let prompt = build_prompt("text", &schema);

        assert!(prompt.contains(&schema.to_pretty_json()));
        assert!(prompt.contains("free_cash_flow_per_share"));
        assert!(prompt.contains("Date when the 10-K was filed with the SEC"));
    }

    #[test]
    fn test_prompt_includes_directives() {
        let prompt = builder().build("text");
        assert!(prompt.contains("Only include fields defined in the schema"));
        assert!(prompt.contains("single valid JSON object"));
        assert!(prompt.contains("Never guess or fabricate"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = builder();
        assert_eq!(builder.build("same"), builder.build("same"));
    }

    #[test]
    fn test_text_precedes_schema() {
        let prompt = builder().build("DOCUMENT-MARKER");
        let text_pos = prompt.find("DOCUMENT-MARKER").unwrap();
        let schema_pos = prompt.find("must match this JSON schema").unwrap();
        assert!(text_pos < schema_pos);
    }
}
