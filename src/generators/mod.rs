//! Generator catalog for vmforge
//!
//! This module provides the core traits, types, and registry for the vmforge
//! generator system. Generators are the building blocks that turn a small
//! configuration map into an ARM JSON resource definition.

pub mod availability;
pub mod backup;
pub mod disks;
pub mod extensions;
pub mod monitoring;
pub mod recovery;
pub mod scaling;
pub mod vmss;
pub mod workbooks;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Parameters passed to a generator. Insertion-ordered so helper kwargs and
/// CLI `--param` flags flow through in the order they were given.
pub type GeneratorParams = IndexMap<String, serde_json::Value>;

/// Structured result of validating a generator configuration.
///
/// Hard failures go into `errors`; quality issues that still produce a
/// usable resource go into `warnings`; Azure best-practice hints go into
/// `recommendations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the configuration can produce a valid resource
    pub is_valid: bool,
    /// Hard validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Non-fatal issues
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Best-practice suggestions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    /// Create a passing report with no findings.
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    /// Record a hard failure. Marks the report invalid.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Record a best-practice recommendation.
    pub fn recommend(&mut self, msg: impl Into<String>) {
        self.recommendations.push(msg.into());
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.is_valid = self.is_valid && other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.recommendations.extend(other.recommendations);
    }

    /// Convert a failing report into a typed error for callers that need
    /// hard failure semantics.
    pub fn into_result(self, generator: &str) -> Result<Self> {
        if self.is_valid {
            Ok(self)
        } else {
            Err(Error::validation_failed(generator, &self.errors))
        }
    }
}

/// Trait that all generators must implement.
pub trait Generator: Send + Sync {
    /// Returns the helper name of the generator (e.g. `availability_set`).
    fn name(&self) -> &'static str;

    /// Returns a description of the resource this generator emits.
    fn description(&self) -> &'static str;

    /// Returns the list of required parameters.
    fn required_params(&self) -> &[&'static str] {
        &[]
    }

    /// Validate the configuration without generating anything.
    ///
    /// The default implementation only checks required parameters.
    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();
        for param in self.required_params() {
            if !params.contains_key(*param) {
                report.error(format!("missing required parameter '{}'", param));
            }
        }
        report
    }

    /// Generate the ARM resource JSON for the given configuration.
    fn generate(&self, params: &GeneratorParams) -> Result<serde_json::Value>;
}

/// Helper trait for extracting parameters.
pub trait ParamExt {
    fn get_string(&self, key: &str) -> Result<Option<String>>;
    fn get_string_required(&self, key: &str) -> Result<String>;
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;
    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool>;
    fn get_i64(&self, key: &str) -> Result<Option<i64>>;
    fn get_u32(&self, key: &str) -> Result<Option<u32>>;
    fn get_u64(&self, key: &str) -> Result<Option<u64>>;
    fn get_vec_string(&self, key: &str) -> Result<Option<Vec<String>>>;
}

impl ParamExt for GeneratorParams {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(serde_json::Value::Null) => Ok(None),
            Some(v) => Ok(Some(v.to_string().trim_matches('"').to_string())),
            None => Ok(None),
        }
    }

    fn get_string_required(&self, key: &str) -> Result<String> {
        self.get_string(key)?
            .ok_or_else(|| Error::MissingParameter(key.to_string()))
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
            Some(serde_json::Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Some(true)),
                "false" | "no" | "0" | "off" => Ok(Some(false)),
                _ => Err(Error::InvalidParameter(format!(
                    "{} must be a boolean",
                    key
                ))),
            },
            Some(_) => Err(Error::InvalidParameter(format!(
                "{} must be a boolean",
                key
            ))),
            None => Ok(None),
        }
    }

    /// Boolean with a default. The default applies only when the key is
    /// absent; a present but unparseable value is an error.
    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.get_bool(key)?.unwrap_or(default))
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::InvalidParameter(format!("{} must be an integer", key))),
            Some(serde_json::Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| Error::InvalidParameter(format!("{} must be an integer", key))),
            Some(_) => Err(Error::InvalidParameter(format!(
                "{} must be an integer",
                key
            ))),
            None => Ok(None),
        }
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        match self.get_u64(key)? {
            Some(v) => u32::try_from(v).map(Some).map_err(|_| {
                Error::InvalidParameter(format!("{} must fit in a 32-bit integer", key))
            }),
            None => Ok(None),
        }
    }

    fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            Some(serde_json::Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
                Error::InvalidParameter(format!("{} must be a positive integer", key))
            }),
            Some(serde_json::Value::String(s)) => s.parse().map(Some).map_err(|_| {
                Error::InvalidParameter(format!("{} must be a positive integer", key))
            }),
            Some(_) => Err(Error::InvalidParameter(format!(
                "{} must be a positive integer",
                key
            ))),
            None => Ok(None),
        }
    }

    fn get_vec_string(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            Some(serde_json::Value::Array(arr)) => {
                let mut result = Vec::new();
                for item in arr {
                    match item {
                        serde_json::Value::String(s) => result.push(s.clone()),
                        v => result.push(v.to_string().trim_matches('"').to_string()),
                    }
                }
                Ok(Some(result))
            }
            Some(serde_json::Value::String(s)) => {
                // Handle comma-separated string
                Ok(Some(s.split(',').map(|s| s.trim().to_string()).collect()))
            }
            Some(_) => Err(Error::InvalidParameter(format!(
                "{} must be an array",
                key
            ))),
            None => Ok(None),
        }
    }
}

/// Registry for looking up generators by helper name.
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Create a registry with the whole built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Placement
        registry.register(Arc::new(availability::AvailabilitySetGenerator));
        registry.register(Arc::new(availability::ZonePlacementGenerator));
        registry.register(Arc::new(vmss::ScaleSetGenerator));

        // Backup and recovery
        registry.register(Arc::new(backup::RecoveryVaultGenerator));
        registry.register(Arc::new(backup::BackupPolicyGenerator));
        registry.register(Arc::new(backup::ProtectedItemGenerator));
        registry.register(Arc::new(recovery::ReplicationPolicyGenerator));

        // Storage
        registry.register(Arc::new(disks::ManagedDiskGenerator));

        // Observability
        registry.register(Arc::new(monitoring::DiagnosticSettingsGenerator));
        registry.register(Arc::new(monitoring::MetricAlertGenerator));
        registry.register(Arc::new(workbooks::WorkbookGenerator));

        // Runtime shape
        registry.register(Arc::new(extensions::VmExtensionGenerator));
        registry.register(Arc::new(scaling::AutoscaleGenerator));

        registry
    }

    /// Register a generator.
    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        self.generators
            .insert(generator.name().to_string(), generator);
    }

    /// Get a generator by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(name).cloned()
    }

    /// Check if a generator exists.
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Get all generator names, sorted for stable listings.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Validate a configuration against a named generator.
    pub fn validate(&self, name: &str, params: &GeneratorParams) -> Result<ValidationReport> {
        let generator = self
            .get(name)
            .ok_or_else(|| Error::GeneratorNotFound(name.to_string()))?;
        Ok(generator.validate(params))
    }

    /// Validate then generate: the single entry point used by the helper
    /// layer and the CLI.
    pub fn run(&self, name: &str, params: &GeneratorParams) -> Result<serde_json::Value> {
        let generator = self
            .get(name)
            .ok_or_else(|| Error::GeneratorNotFound(name.to_string()))?;

        generator.validate(params).into_result(name)?;
        generator.generate(params)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestGenerator;

    impl Generator for TestGenerator {
        fn name(&self) -> &'static str {
            "test"
        }

        fn description(&self) -> &'static str {
            "A test generator"
        }

        fn required_params(&self) -> &[&'static str] {
            &["name"]
        }

        fn generate(&self, params: &GeneratorParams) -> Result<serde_json::Value> {
            let name = params.get_string_required("name")?;
            Ok(serde_json::json!({ "name": name }))
        }
    }

    #[test]
    fn test_registry_register_and_run() {
        let mut registry = GeneratorRegistry::new();
        registry.register(Arc::new(TestGenerator));

        assert!(registry.contains("test"));
        assert!(!registry.contains("nonexistent"));

        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), serde_json::json!("thing"));
        let value = registry.run("test", &params).unwrap();
        assert_eq!(value["name"], "thing");
    }

    #[test]
    fn test_registry_run_rejects_missing_required() {
        let mut registry = GeneratorRegistry::new();
        registry.register(Arc::new(TestGenerator));

        let params = GeneratorParams::new();
        let err = registry.run("test", &params).unwrap_err();
        assert!(err.to_string().contains("missing required parameter"));
    }

    #[test]
    fn test_registry_unknown_generator() {
        let registry = GeneratorRegistry::new();
        let err = registry.run("nope", &GeneratorParams::new()).unwrap_err();
        assert!(matches!(err, Error::GeneratorNotFound(_)));
    }

    #[test]
    fn test_validation_report_accumulates() {
        let mut report = ValidationReport::ok();
        assert!(report.is_valid);

        report.warn("minor");
        report.recommend("consider zones");
        assert!(report.is_valid);

        report.error("broken");
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_validation_report_merge() {
        let mut a = ValidationReport::ok();
        a.warn("w1");

        let mut b = ValidationReport::ok();
        b.error("e1");

        a.merge(b);
        assert!(!a.is_valid);
        assert_eq!(a.warnings, vec!["w1"]);
        assert_eq!(a.errors, vec!["e1"]);
    }

    #[test]
    fn test_param_ext() {
        let mut params = GeneratorParams::new();
        params.insert("string".to_string(), serde_json::json!("hello"));
        params.insert("bool_true".to_string(), serde_json::json!(true));
        params.insert("bool_str".to_string(), serde_json::json!("yes"));
        params.insert("number".to_string(), serde_json::json!(42));
        params.insert(
            "array".to_string(),
            serde_json::json!(["one", "two", "three"]),
        );

        assert_eq!(
            params.get_string("string").unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(params.get_bool("bool_true").unwrap(), Some(true));
        assert_eq!(params.get_bool("bool_str").unwrap(), Some(true));
        assert_eq!(params.get_i64("number").unwrap(), Some(42));
        assert_eq!(params.get_u32("number").unwrap(), Some(42));
        assert_eq!(
            params.get_vec_string("array").unwrap(),
            Some(vec![
                "one".to_string(),
                "two".to_string(),
                "three".to_string()
            ])
        );
    }

    #[test]
    fn test_params_preserve_insertion_order() {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), serde_json::json!("web"));
        params.insert("location".to_string(), serde_json::json!("eastus"));
        params.insert("sku".to_string(), serde_json::json!("Premium_LRS"));

        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "location", "sku"]);
    }

    #[test]
    fn test_param_ext_comma_separated_list() {
        let mut params = GeneratorParams::new();
        params.insert("zones".to_string(), serde_json::json!("1, 2,3"));
        assert_eq!(
            params.get_vec_string("zones").unwrap(),
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_param_ext_type_errors() {
        let mut params = GeneratorParams::new();
        params.insert("n".to_string(), serde_json::json!([1, 2]));
        assert!(params.get_i64("n").is_err());
        assert!(params.get_bool("n").is_err());
    }

    #[test]
    fn test_bool_default_only_covers_absence() {
        let mut params = GeneratorParams::new();
        assert_eq!(params.get_bool_or("missing", true).unwrap(), true);

        params.insert("flag".to_string(), serde_json::json!("off"));
        assert_eq!(params.get_bool_or("flag", true).unwrap(), false);

        params.insert("flag".to_string(), serde_json::json!("bogus"));
        assert!(params.get_bool_or("flag", true).is_err());
    }

    #[test]
    fn test_builtin_catalog_is_complete() {
        let registry = GeneratorRegistry::with_builtins();
        for name in [
            "availability_set",
            "zone_placement",
            "scale_set",
            "recovery_vault",
            "backup_policy",
            "protected_item",
            "replication_policy",
            "managed_disk",
            "diagnostic_settings",
            "metric_alert",
            "workbook",
            "vm_extension",
            "autoscale_settings",
        ] {
            assert!(registry.contains(name), "missing builtin '{}'", name);
        }
    }
}
