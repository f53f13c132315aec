//! Autoscale settings generator.
//!
//! Emits a `Microsoft.Insights/autoscaleSettings` resource targeting a VM
//! scale set, with a default profile built from metric-driven scale rules.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Autoscale setting name |
//! | `location` | Yes | Azure region |
//! | `target_id` | Yes | Scale set resource ID |
//! | `min_capacity` | Yes | Profile floor |
//! | `max_capacity` | Yes | Profile ceiling |
//! | `default_capacity` | No | Initial instance count (default: min) |
//! | `rules` | No | Array of rule objects, see below |
//! | `tags` | No | Resource tags |
//!
//! Each rule object:
//!
//! | Field | Required | Description |
//! |-------|----------|-------------|
//! | `metric` | Yes | Metric name, e.g. Percentage CPU |
//! | `operator` | Yes | GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual |
//! | `threshold` | Yes | Trigger threshold |
//! | `direction` | Yes | Increase or Decrease |
//! | `change` | No | Instance count delta (default: 1) |
//! | `window_minutes` | No | Look-back window, 5-720 (default: 10) |
//! | `cooldown_minutes` | No | Cooldown after action, 1-10080 (default: 5) |

use crate::arm::{validate_location, validate_resource_name, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::monitoring::AlertOperator;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2022-10-01";

const MIN_WINDOW_MINUTES: i64 = 5;
const MAX_WINDOW_MINUTES: i64 = 720;
const MIN_COOLDOWN_MINUTES: i64 = 1;
const MAX_COOLDOWN_MINUTES: i64 = 10_080;

/// Scale direction for an autoscale rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Increase,
    Decrease,
}

impl ScaleDirection {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "increase" => Ok(Self::Increase),
            "decrease" => Ok(Self::Decrease),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid direction '{}'. Valid directions: Increase, Decrease",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "Increase",
            Self::Decrease => "Decrease",
        }
    }
}

/// One metric-driven scale rule.
#[derive(Debug, Clone)]
struct ScaleRule {
    metric: String,
    operator: AlertOperator,
    threshold: f64,
    direction: ScaleDirection,
    change: u32,
    window_minutes: i64,
    cooldown_minutes: i64,
}

impl ScaleRule {
    fn from_value(value: &Value, index: usize) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            Error::InvalidParameter(format!("rules[{}] must be an object", index))
        })?;

        let str_field = |key: &str| -> Result<String> {
            obj.get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::InvalidParameter(format!("rules[{}] is missing '{}'", index, key))
                })
        };

        Ok(Self {
            metric: str_field("metric")?,
            operator: AlertOperator::from_str(&str_field("operator")?)?,
            threshold: obj.get("threshold").and_then(|v| v.as_f64()).ok_or_else(|| {
                Error::InvalidParameter(format!("rules[{}] is missing 'threshold'", index))
            })?,
            direction: ScaleDirection::from_str(&str_field("direction")?)?,
            change: match obj.get("change") {
                Some(v) => {
                    let raw = v.as_u64().ok_or_else(|| {
                        Error::InvalidParameter(format!(
                            "rules[{}]: 'change' must be a positive integer",
                            index
                        ))
                    })?;
                    u32::try_from(raw).map_err(|_| {
                        Error::InvalidParameter(format!(
                            "rules[{}]: 'change' must fit in a 32-bit integer",
                            index
                        ))
                    })?
                }
                None => 1,
            },
            window_minutes: obj.get("window_minutes").and_then(|v| v.as_i64()).unwrap_or(10),
            cooldown_minutes: obj
                .get("cooldown_minutes")
                .and_then(|v| v.as_i64())
                .unwrap_or(5),
        })
    }

    fn to_arm(&self, target_id: &str) -> Value {
        json!({
            "metricTrigger": {
                "metricName": self.metric,
                "metricResourceUri": target_id,
                "timeGrain": "PT1M",
                "statistic": "Average",
                "timeWindow": format!("PT{}M", self.window_minutes),
                "timeAggregation": "Average",
                "operator": self.operator.as_str(),
                "threshold": self.threshold,
            },
            "scaleAction": {
                "direction": self.direction.as_str(),
                "type": "ChangeCount",
                "value": self.change.to_string(),
                "cooldown": format!("PT{}M", self.cooldown_minutes),
            },
        })
    }
}

#[derive(Debug, Clone)]
struct AutoscaleConfig {
    name: String,
    location: String,
    target_id: String,
    min_capacity: u64,
    max_capacity: u64,
    default_capacity: u64,
    rules: Vec<ScaleRule>,
    tags: Map<String, Value>,
}

impl AutoscaleConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let min_capacity = params
            .get_u64("min_capacity")?
            .ok_or_else(|| Error::MissingParameter("min_capacity".to_string()))?;
        let max_capacity = params
            .get_u64("max_capacity")?
            .ok_or_else(|| Error::MissingParameter("max_capacity".to_string()))?;

        let rules = match params.get("rules") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| ScaleRule::from_value(v, i))
                .collect::<Result<Vec<_>>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(Error::InvalidParameter(
                    "rules must be an array of rule objects".to_string(),
                ))
            }
        };

        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            target_id: params.get_string_required("target_id")?,
            min_capacity,
            max_capacity,
            default_capacity: params.get_u64("default_capacity")?.unwrap_or(min_capacity),
            rules,
            tags: extract_tags(params),
        })
    }
}

/// Generator for `Microsoft.Insights/autoscaleSettings` resources.
pub struct AutoscaleGenerator;

impl Generator for AutoscaleGenerator {
    fn name(&self) -> &'static str {
        "autoscale_settings"
    }

    fn description(&self) -> &'static str {
        "Metric-driven autoscale profile for a VM scale set"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location", "target_id", "min_capacity", "max_capacity"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match AutoscaleConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        if config.min_capacity > config.max_capacity {
            report.error(format!(
                "min_capacity {} exceeds max_capacity {}",
                config.min_capacity, config.max_capacity
            ));
        }
        if config.default_capacity < config.min_capacity
            || config.default_capacity > config.max_capacity
        {
            report.error(format!(
                "default_capacity {} is outside [{}, {}]",
                config.default_capacity, config.min_capacity, config.max_capacity
            ));
        }

        for (i, rule) in config.rules.iter().enumerate() {
            if !(MIN_WINDOW_MINUTES..=MAX_WINDOW_MINUTES).contains(&rule.window_minutes) {
                report.error(format!(
                    "rules[{}]: window_minutes must be between {} and {}, got {}",
                    i, MIN_WINDOW_MINUTES, MAX_WINDOW_MINUTES, rule.window_minutes
                ));
            }
            if !(MIN_COOLDOWN_MINUTES..=MAX_COOLDOWN_MINUTES).contains(&rule.cooldown_minutes) {
                report.error(format!(
                    "rules[{}]: cooldown_minutes must be between {} and {}, got {}",
                    i, MIN_COOLDOWN_MINUTES, MAX_COOLDOWN_MINUTES, rule.cooldown_minutes
                ));
            }
            if rule.change == 0 {
                report.error(format!("rules[{}]: change must be at least 1", i));
            }
        }

        let has_increase = config
            .rules
            .iter()
            .any(|r| r.direction == ScaleDirection::Increase);
        let has_decrease = config
            .rules
            .iter()
            .any(|r| r.direction == ScaleDirection::Decrease);
        if has_increase && !has_decrease {
            report.warn("scale-out rules without a scale-in rule never release capacity");
        }
        if config.rules.is_empty() {
            report.warn("no rules given; the profile pins capacity at the default");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = AutoscaleConfig::from_params(params)?;

        let rules: Vec<Value> = config
            .rules
            .iter()
            .map(|r| r.to_arm(&config.target_id))
            .collect();

        Ok(json!({
            "type": "Microsoft.Insights/autoscaleSettings",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "properties": {
                "enabled": true,
                "targetResourceUri": config.target_id,
                "profiles": [{
                    "name": "default",
                    "capacity": {
                        "minimum": config.min_capacity.to_string(),
                        "maximum": config.max_capacity.to_string(),
                        "default": config.default_capacity.to_string(),
                    },
                    "rules": rules,
                }],
            },
            "tags": Value::Object(config.tags),
        }))
    }
}
