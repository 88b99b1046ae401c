//! Extraction schema: the output contract sent to the completion service.
//!
//! The schema is generated from [`AnnualReport`] so the prompt, the service
//! constraint and the response check all read the same definition.

use schemars::r#gen::SchemaSettings;
use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use serde_json::Value;
use tracing::warn;

use crate::models::report::AnnualReport;

/// Value type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    String,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Ordered list of strings.
    StringList,
}

impl FieldKind {
    fn from_schema(schema: &SchemaObject) -> Option<Self> {
        let primary = match schema.instance_type.as_ref()? {
            SingleOrVec::Single(t) => **t,
            SingleOrVec::Vec(types) => *types.iter().find(|t| **t != InstanceType::Null)?,
        };

        match primary {
            InstanceType::String if schema.format.as_deref() == Some("date") => Some(Self::Date),
            InstanceType::String => Some(Self::String),
            InstanceType::Integer => Some(Self::Integer),
            InstanceType::Number => Some(Self::Float),
            InstanceType::Array => Some(Self::StringList),
            _ => None,
        }
    }
}

/// One declared field of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in the JSON payload.
    pub name: String,
    /// Declared value type.
    pub kind: FieldKind,
    /// Whether a response without this field is a violation.
    pub required: bool,
    /// Natural-language guidance for the model.
    pub description: String,
}

/// Ordered `FieldSpec`s plus the JSON Schema they were read from.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    root: RootSchema,
    fields: Vec<FieldSpec>,
}

impl ExtractionSchema {
    /// Schema for [`AnnualReport`].
    pub fn for_annual_report() -> Self {
        Self::for_type::<AnnualReport>()
    }

    /// Schema for any serde model deriving [`JsonSchema`].
    pub fn for_type<T: JsonSchema>() -> Self {
        let settings = SchemaSettings::draft07().with(|s| {
            s.meta_schema = None;
            s.inline_subschemas = true;
        });
        let root = settings.into_generator().into_root_schema_for::<T>();
        let fields = collect_fields(&root.schema);

        Self { root, fields }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields the response must contain.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Title of the root schema (the model type name).
    pub fn title(&self) -> Option<&str> {
        self.root
            .schema
            .metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
    }

    /// JSON Schema (draft-07, no `$schema` key) transmitted to the service.
    pub fn to_json_schema(&self) -> Value {
        serde_json::to_value(&self.root).unwrap_or_default()
    }

    /// Indented JSON Schema for embedding into prompts.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.root).unwrap_or_default()
    }
}

fn collect_fields(schema: &SchemaObject) -> Vec<FieldSpec> {
    let Some(object) = schema.object.as_ref() else {
        return Vec::new();
    };

    let mut fields = Vec::with_capacity(object.properties.len());
    for (name, property) in &object.properties {
        let Schema::Object(property) = property else {
            warn!("Schema property '{}' is a boolean schema, skipping", name);
            continue;
        };

        let Some(kind) = FieldKind::from_schema(property) else {
            warn!("Schema property '{}' has an unsupported type, skipping", name);
            continue;
        };

        let description = property
            .metadata
            .as_ref()
            .and_then(|m| m.description.clone())
            .unwrap_or_default();

        fields.push(FieldSpec {
            name: name.clone(),
            kind,
            required: object.required.contains(name),
            description,
        });
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_order_follows_model() {
        let schema = ExtractionSchema::for_annual_report();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names.len(), 20);
        assert_eq!(&names[..5], &[
            "company_name",
            "auditor",
            "business_description",
            "filing_date",
            "risk_factors",
        ]);
        assert_eq!(names.last(), Some(&"free_cash_flow_per_share"));
    }

    #[test]
    fn test_required_fields() {
        let schema = ExtractionSchema::for_annual_report();
        assert_eq!(schema.required_fields(), vec!["company_name", "filing_date"]);
    }

    #[test]
    fn test_field_kinds() {
        let schema = ExtractionSchema::for_annual_report();
        let kind = |name: &str| schema.field(name).map(|f| f.kind);

        assert_eq!(kind("company_name"), Some(FieldKind::String));
        assert_eq!(kind("filing_date"), Some(FieldKind::Date));
        assert_eq!(kind("risk_factors"), Some(FieldKind::StringList));
        assert_eq!(kind("total_employees"), Some(FieldKind::Integer));
        assert_eq!(kind("total_revenue"), Some(FieldKind::Integer));
        assert_eq!(kind("gross_margin"), Some(FieldKind::Float));
        assert_eq!(kind("no_such_field"), None);
    }

    #[test]
    fn test_descriptions_come_from_docs() {
        let schema = ExtractionSchema::for_annual_report();
        let auditor = schema.field("auditor").unwrap();

        assert_eq!(auditor.description, "Name of the external auditor");
        assert!(!auditor.required);
        assert!(schema.fields().iter().all(|f| !f.description.is_empty()));
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = ExtractionSchema::for_annual_report();
        let json = schema.to_json_schema();

        assert_eq!(json["type"], "object");
        assert_eq!(json["title"], "AnnualReport");
        assert!(json.get("$schema").is_none());
        assert_eq!(json["properties"]["filing_date"]["format"], "date");
        assert_eq!(json["required"], serde_json::json!(["company_name", "filing_date"]));
        assert_eq!(schema.title(), Some("AnnualReport"));
    }

    #[test]
    fn test_pretty_json_mentions_every_field() {
        let schema = ExtractionSchema::for_annual_report();
        let pretty = schema.to_pretty_json();

        for field in schema.fields() {
            assert!(pretty.contains(&field.name), "missing {}", field.name);
        }
    }
}
