//! Diagnostic settings and metric alert generators.
//!
//! ## DiagnosticSettingsGenerator
//!
//! Emits a `Microsoft.Insights/diagnosticSettings` resource routing platform
//! metrics and logs to a Log Analytics workspace.
//!
//! ## MetricAlertGenerator
//!
//! Emits a `Microsoft.Insights/metricAlerts` resource with a static
//! threshold criterion and an optional action group.
//!
//! ### MetricAlertGenerator parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Alert rule name |
//! | `scope_id` | Yes | Resource ID the alert watches |
//! | `metric_name` | Yes | Metric to evaluate (e.g. Percentage CPU) |
//! | `operator` | No | GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual (default: GreaterThan) |
//! | `threshold` | Yes | Static threshold value |
//! | `severity` | No | 0 (critical) to 4 (verbose), default 3 |
//! | `window_minutes` | No | Evaluation window, default 5 |
//! | `frequency_minutes` | No | Evaluation frequency, default 1 |
//! | `aggregation` | No | Average, Minimum, Maximum, Total, Count (default: Average) |
//! | `action_group_id` | No | Action group to notify |

use crate::arm::{validate_resource_name, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const DIAGNOSTICS_API_VERSION: &str = "2021-05-01-preview";
const ALERT_API_VERSION: &str = "2018-03-01";

const MIN_SEVERITY: i64 = 0;
const MAX_SEVERITY: i64 = 4;

/// Windows and frequencies Azure Monitor accepts, in minutes.
const VALID_WINDOWS: &[i64] = &[1, 5, 15, 30, 60, 360, 720, 1440];
const VALID_FREQUENCIES: &[i64] = &[1, 5, 15, 30, 60];

/// Generator for `Microsoft.Insights/diagnosticSettings` resources.
pub struct DiagnosticSettingsGenerator;

#[derive(Debug, Clone)]
struct DiagnosticsConfig {
    name: String,
    target_id: String,
    workspace_id: String,
    metric_categories: Vec<String>,
    log_categories: Vec<String>,
    retention_days: Option<u32>,
}

impl DiagnosticsConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        Ok(Self {
            name: params.get_string_required("name")?,
            target_id: params.get_string_required("target_id")?,
            workspace_id: params.get_string_required("workspace_id")?,
            metric_categories: params
                .get_vec_string("metric_categories")?
                .unwrap_or_else(|| vec!["AllMetrics".to_string()]),
            log_categories: params.get_vec_string("log_categories")?.unwrap_or_default(),
            retention_days: params.get_u32("retention_days")?,
        })
    }
}

impl Generator for DiagnosticSettingsGenerator {
    fn name(&self) -> &'static str {
        "diagnostic_settings"
    }

    fn description(&self) -> &'static str {
        "Diagnostic settings routing platform metrics and logs to Log Analytics"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "target_id", "workspace_id"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match DiagnosticsConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        if config.name.is_empty() {
            report.error("name must not be empty");
        }
        if !config.target_id.starts_with("/subscriptions/") && !config.target_id.starts_with('[') {
            report.error(format!(
                "target_id '{}' is neither a resource ID nor a template expression",
                config.target_id
            ));
        }
        if config.metric_categories.is_empty() && config.log_categories.is_empty() {
            report.error("at least one metric or log category must be enabled");
        }
        if let Some(days) = config.retention_days {
            if days > 365 {
                report.error(format!(
                    "retention_days must be at most 365, got {}",
                    days
                ));
            }
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = DiagnosticsConfig::from_params(params)?;

        let retention = match config.retention_days {
            Some(days) => json!({ "enabled": true, "days": days }),
            None => json!({ "enabled": false, "days": 0 }),
        };

        let metrics: Vec<Value> = config
            .metric_categories
            .iter()
            .map(|category| {
                json!({
                    "category": category,
                    "enabled": true,
                    "retentionPolicy": retention,
                })
            })
            .collect();

        let logs: Vec<Value> = config
            .log_categories
            .iter()
            .map(|category| {
                json!({
                    "category": category,
                    "enabled": true,
                    "retentionPolicy": retention,
                })
            })
            .collect();

        Ok(json!({
            "type": "Microsoft.Insights/diagnosticSettings",
            "apiVersion": DIAGNOSTICS_API_VERSION,
            "scope": config.target_id,
            "name": config.name,
            "properties": {
                "workspaceId": config.workspace_id,
                "metrics": metrics,
                "logs": logs,
            },
        }))
    }
}

/// Comparison operator for a static metric alert criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOperator {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl AlertOperator {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "greaterthan" => Ok(Self::GreaterThan),
            "greaterthanorequal" => Ok(Self::GreaterThanOrEqual),
            "lessthan" => Ok(Self::LessThan),
            "lessthanorequal" => Ok(Self::LessThanOrEqual),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid operator '{}'. Valid operators: GreaterThan, \
                 GreaterThanOrEqual, LessThan, LessThanOrEqual",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
        }
    }
}

/// Time aggregation applied over the evaluation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Average,
    Minimum,
    Maximum,
    Total,
    Count,
}

impl Aggregation {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "minimum" => Ok(Self::Minimum),
            "maximum" => Ok(Self::Maximum),
            "total" => Ok(Self::Total),
            "count" => Ok(Self::Count),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid aggregation '{}'. Valid aggregations: Average, \
                 Minimum, Maximum, Total, Count",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Minimum => "Minimum",
            Self::Maximum => "Maximum",
            Self::Total => "Total",
            Self::Count => "Count",
        }
    }
}

#[derive(Debug, Clone)]
struct MetricAlertConfig {
    name: String,
    scope_id: String,
    metric_name: String,
    operator: AlertOperator,
    threshold: f64,
    severity: i64,
    window_minutes: i64,
    frequency_minutes: i64,
    aggregation: Aggregation,
    action_group_id: Option<String>,
    description: Option<String>,
    tags: Map<String, Value>,
}

impl MetricAlertConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let operator = match params.get_string("operator")? {
            Some(s) => AlertOperator::from_str(&s)?,
            None => AlertOperator::GreaterThan,
        };
        let aggregation = match params.get_string("aggregation")? {
            Some(s) => Aggregation::from_str(&s)?,
            None => Aggregation::Average,
        };
        let threshold = match params.get("threshold") {
            Some(v) => v.as_f64().ok_or_else(|| {
                Error::InvalidParameter("threshold must be a number".to_string())
            })?,
            None => return Err(Error::MissingParameter("threshold".to_string())),
        };

        Ok(Self {
            name: params.get_string_required("name")?,
            scope_id: params.get_string_required("scope_id")?,
            metric_name: params.get_string_required("metric_name")?,
            operator,
            threshold,
            severity: params.get_i64("severity")?.unwrap_or(3),
            window_minutes: params.get_i64("window_minutes")?.unwrap_or(5),
            frequency_minutes: params.get_i64("frequency_minutes")?.unwrap_or(1),
            aggregation,
            action_group_id: params.get_string("action_group_id")?,
            description: params.get_string("description")?,
            tags: extract_tags(params),
        })
    }
}

fn iso_duration_minutes(minutes: i64) -> String {
    if minutes % 60 == 0 && minutes >= 60 {
        format!("PT{}H", minutes / 60)
    } else {
        format!("PT{}M", minutes)
    }
}

/// Generator for `Microsoft.Insights/metricAlerts` resources.
pub struct MetricAlertGenerator;

impl Generator for MetricAlertGenerator {
    fn name(&self) -> &'static str {
        "metric_alert"
    }

    fn description(&self) -> &'static str {
        "Static-threshold metric alert with optional action group notification"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "scope_id", "metric_name", "threshold"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match MetricAlertConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_tags(&config.tags, &mut report);

        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&config.severity) {
            report.error(format!(
                "severity must be between {} (critical) and {} (verbose), got {}",
                MIN_SEVERITY, MAX_SEVERITY, config.severity
            ));
        }
        if !VALID_WINDOWS.contains(&config.window_minutes) {
            report.error(format!(
                "window_minutes {} is not a supported window (1, 5, 15, 30, 60, 360, 720, 1440)",
                config.window_minutes
            ));
        }
        if !VALID_FREQUENCIES.contains(&config.frequency_minutes) {
            report.error(format!(
                "frequency_minutes {} is not a supported frequency (1, 5, 15, 30, 60)",
                config.frequency_minutes
            ));
        }
        if config.frequency_minutes > config.window_minutes {
            report.error(format!(
                "evaluation frequency ({} min) must not exceed the window ({} min)",
                config.frequency_minutes, config.window_minutes
            ));
        }

        if config.action_group_id.is_none() {
            report.warn("no action group configured; the alert fires but notifies nobody");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = MetricAlertConfig::from_params(params)?;

        let actions: Vec<Value> = config
            .action_group_id
            .iter()
            .map(|id| json!({ "actionGroupId": id }))
            .collect();

        let description = config
            .description
            .unwrap_or_else(|| format!("Alert on {} for {}", config.metric_name, config.scope_id));

        Ok(json!({
            "type": "Microsoft.Insights/metricAlerts",
            "apiVersion": ALERT_API_VERSION,
            "name": config.name,
            "location": "global",
            "properties": {
                "description": description,
                "severity": config.severity,
                "enabled": true,
                "scopes": [config.scope_id],
                "evaluationFrequency": iso_duration_minutes(config.frequency_minutes),
                "windowSize": iso_duration_minutes(config.window_minutes),
                "criteria": {
                    "odata.type": "Microsoft.Azure.Monitor.SingleResourceMultipleMetricCriteria",
                    "allOf": [{
                        "name": "criterion-1",
                        "metricName": config.metric_name,
                        "operator": config.operator.as_str(),
                        "threshold": config.threshold,
                        "timeAggregation": config.aggregation.as_str(),
                        "criterionType": "StaticThresholdCriterion",
                    }],
                },
                "actions": actions,
            },
            "tags": Value::Object(config.tags),
        }))
    }
}
