//! ARM template document support.
//!
//! Helpers shared by every generator: the outer deployment-template wrapper
//! (`$schema`, `contentVersion`, `parameters`, `variables`, `resources`),
//! resource ID composition, and Azure naming-rule validation.

use crate::generators::ValidationReport;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

/// Schema URL for resource-group-scoped deployment templates.
pub const TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";

/// Content version stamped on every emitted template.
pub const CONTENT_VERSION: &str = "1.0.0.0";

/// Builder for a full ARM deployment template document.
///
/// Generators emit bare resource objects; the CLI's `template` output format
/// and the `arm_template` helper wrap them with this builder.
#[derive(Debug, Default, Clone)]
pub struct TemplateBuilder {
    parameters: Map<String, Value>,
    variables: Map<String, Value>,
    resources: Vec<Value>,
    outputs: Map<String, Value>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a template parameter.
    pub fn parameter(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        default: Option<Value>,
    ) -> Self {
        let mut def = Map::new();
        def.insert("type".to_string(), json!(param_type));
        if let Some(v) = default {
            def.insert("defaultValue".to_string(), v);
        }
        self.parameters.insert(name.into(), Value::Object(def));
        self
    }

    /// Declare a template variable.
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Append a resource definition.
    pub fn resource(mut self, resource: Value) -> Self {
        self.resources.push(resource);
        self
    }

    /// Append several resource definitions.
    pub fn resources(mut self, resources: impl IntoIterator<Item = Value>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Declare a template output.
    pub fn output(mut self, name: impl Into<String>, output_type: &str, value: Value) -> Self {
        self.outputs.insert(
            name.into(),
            json!({ "type": output_type, "value": value }),
        );
        self
    }

    /// Build the final template document.
    pub fn build(self) -> Value {
        json!({
            "$schema": TEMPLATE_SCHEMA,
            "contentVersion": CONTENT_VERSION,
            "parameters": Value::Object(self.parameters),
            "variables": Value::Object(self.variables),
            "resources": Value::Array(self.resources),
            "outputs": Value::Object(self.outputs),
        })
    }
}

/// Wrap a single resource in a minimal deployment template.
pub fn wrap_resource(resource: Value) -> Value {
    TemplateBuilder::new().resource(resource).build()
}

/// Compose a fully qualified resource ID.
///
/// `resource_id("sub", "rg", "Microsoft.Compute", "availabilitySets", "as1")`
/// yields
/// `/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/availabilitySets/as1`.
pub fn resource_id(
    subscription: &str,
    resource_group: &str,
    provider: &str,
    resource_type: &str,
    name: &str,
) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
        subscription, resource_group, provider, resource_type, name
    )
}

/// Compose an ARM `resourceId(...)` template expression for use inside
/// template documents that resolve IDs at deployment time.
pub fn resource_id_expression(provider_type: &str, name: &str) -> String {
    format!("[resourceId('{}', '{}')]", provider_type, name)
}

fn resource_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9._-]{0,78}[A-Za-z0-9_]$").unwrap())
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9]{2,29}$").unwrap())
}

/// Validate a compute-style resource name (availability sets, VMSS, disks):
/// 1-80 characters, alphanumeric start, alphanumerics, periods, underscores
/// and hyphens, must not end in a period or hyphen.
pub fn validate_resource_name(name: &str, report: &mut ValidationReport) {
    if name.is_empty() {
        report.error("resource name must not be empty");
        return;
    }
    if name.len() == 1 {
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            report.error(format!("resource name '{}' must be alphanumeric", name));
        }
        return;
    }
    if !resource_name_re().is_match(name) {
        report.error(format!(
            "resource name '{}' violates Azure naming rules (1-80 chars, \
             alphanumeric start, no trailing period or hyphen)",
            name
        ));
    }
}

/// Validate an Azure region short name (e.g. `eastus`, `westeurope`).
pub fn validate_location(location: &str, report: &mut ValidationReport) {
    if !location_re().is_match(location) {
        report.error(format!(
            "location '{}' is not a valid Azure region short name",
            location
        ));
    }
}

/// Validate resource tags: at most 50 tags, names up to 512 characters,
/// values up to 256.
pub fn validate_tags(tags: &Map<String, Value>, report: &mut ValidationReport) {
    if tags.len() > 50 {
        report.error(format!("{} tags given, Azure allows at most 50", tags.len()));
    }
    for (key, value) in tags {
        if key.len() > 512 {
            report.error(format!("tag name '{}' exceeds 512 characters", key));
        }
        match value.as_str() {
            Some(s) if s.len() > 256 => {
                report.error(format!("tag value for '{}' exceeds 256 characters", key));
            }
            Some(_) => {}
            None => report.warn(format!("tag '{}' has a non-string value", key)),
        }
    }
}
