//! Azure Monitor workbook generator.
//!
//! Emits a `Microsoft.Insights/workbooks` resource carrying serialized
//! workbook content. Workbook names are GUID-style identifiers; the
//! human-facing title lives in `displayName`.

use crate::arm::{validate_location, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const API_VERSION: &str = "2022-04-01";

fn guid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .unwrap()
    })
}

#[derive(Debug, Clone)]
struct WorkbookConfig {
    name: String,
    location: String,
    display_name: String,
    serialized_data: String,
    category: String,
    source_id: String,
    tags: Map<String, Value>,
}

impl WorkbookConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        // serialized_data may arrive as a pre-serialized string or as the
        // workbook content object itself.
        let serialized_data = match params.get("serialized_data") {
            Some(Value::String(s)) => s.clone(),
            Some(v @ Value::Object(_)) => serde_json::to_string(v)?,
            Some(_) => {
                return Err(Error::InvalidParameter(
                    "serialized_data must be a JSON string or object".to_string(),
                ))
            }
            None => return Err(Error::MissingParameter("serialized_data".to_string())),
        };

        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            display_name: params.get_string_required("display_name")?,
            serialized_data,
            category: params
                .get_string("category")?
                .unwrap_or_else(|| "workbook".to_string()),
            source_id: params
                .get_string("source_id")?
                .unwrap_or_else(|| "azure monitor".to_string()),
            tags: extract_tags(params),
        })
    }
}

/// Generator for `Microsoft.Insights/workbooks` resources.
pub struct WorkbookGenerator;

impl Generator for WorkbookGenerator {
    fn name(&self) -> &'static str {
        "workbook"
    }

    fn description(&self) -> &'static str {
        "Shared Azure Monitor workbook with serialized dashboard content"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location", "display_name", "serialized_data"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match WorkbookConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        if !guid_re().is_match(&config.name) {
            report.error(format!(
                "workbook name '{}' must be a GUID; the title goes in display_name",
                config.name
            ));
        }
        if config.display_name.is_empty() {
            report.error("display_name must not be empty");
        }
        if serde_json::from_str::<Value>(&config.serialized_data).is_err() {
            report.error("serialized_data is not valid JSON");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = WorkbookConfig::from_params(params)?;

        Ok(json!({
            "type": "Microsoft.Insights/workbooks",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "kind": "shared",
            "properties": {
                "displayName": config.display_name,
                "serializedData": config.serialized_data,
                "version": "Notebook/1.0",
                "category": config.category,
                "sourceId": config.source_id,
            },
            "tags": Value::Object(config.tags),
        }))
    }
}
