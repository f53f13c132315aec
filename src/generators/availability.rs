//! Availability set and zone placement generators.
//!
//! ## AvailabilitySetGenerator
//!
//! Emits a `Microsoft.Compute/availabilitySets` resource with the managed
//! (aligned) SKU.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Availability set name |
//! | `location` | Yes | Azure region |
//! | `fault_domains` | No | Platform fault domain count, 1-3 (default: 2) |
//! | `update_domains` | No | Platform update domain count, 1-20 (default: 5) |
//! | `tags` | No | Resource tags |
//!
//! ## ZonePlacementGenerator
//!
//! Emits a zone-placement fragment (`zones` array plus a placement summary)
//! for spreading VMs across availability zones 1-3. This is not a standalone
//! ARM resource; it is merged into VM or VMSS definitions by templates.

use crate::arm::{validate_location, validate_resource_name, validate_tags};
use crate::error::Result;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2023-03-01";

const MIN_FAULT_DOMAINS: u32 = 1;
const MAX_FAULT_DOMAINS: u32 = 3;
const MIN_UPDATE_DOMAINS: u32 = 1;
const MAX_UPDATE_DOMAINS: u32 = 20;

/// Parsed availability set configuration.
#[derive(Debug, Clone)]
struct AvailabilitySetConfig {
    name: String,
    location: String,
    fault_domains: u32,
    update_domains: u32,
    tags: Map<String, Value>,
}

impl AvailabilitySetConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            fault_domains: params.get_u32("fault_domains")?.unwrap_or(2),
            update_domains: params.get_u32("update_domains")?.unwrap_or(5),
            tags: extract_tags(params),
        })
    }
}

pub(crate) fn extract_tags(params: &GeneratorParams) -> Map<String, Value> {
    params
        .get("tags")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default()
}

/// Generator for `Microsoft.Compute/availabilitySets` resources.
pub struct AvailabilitySetGenerator;

impl Generator for AvailabilitySetGenerator {
    fn name(&self) -> &'static str {
        "availability_set"
    }

    fn description(&self) -> &'static str {
        "Availability set with managed (aligned) SKU and fault/update domain placement"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match AvailabilitySetConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        if !(MIN_FAULT_DOMAINS..=MAX_FAULT_DOMAINS).contains(&config.fault_domains) {
            report.error(format!(
                "fault_domains must be between {} and {}, got {}",
                MIN_FAULT_DOMAINS, MAX_FAULT_DOMAINS, config.fault_domains
            ));
        }
        if !(MIN_UPDATE_DOMAINS..=MAX_UPDATE_DOMAINS).contains(&config.update_domains) {
            report.error(format!(
                "update_domains must be between {} and {}, got {}",
                MIN_UPDATE_DOMAINS, MAX_UPDATE_DOMAINS, config.update_domains
            ));
        }

        if config.fault_domains == 1 {
            report.warn("a single fault domain provides no rack-level fault isolation");
        }
        if config.update_domains < 5 {
            report.recommend(
                "5 or more update domains reduce the share of VMs rebooted per platform update",
            );
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = AvailabilitySetConfig::from_params(params)?;

        Ok(json!({
            "type": "Microsoft.Compute/availabilitySets",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "sku": { "name": "Aligned" },
            "properties": {
                "platformFaultDomainCount": config.fault_domains,
                "platformUpdateDomainCount": config.update_domains,
            },
            "tags": Value::Object(config.tags),
        }))
    }
}

/// Generator for a zone placement fragment.
pub struct ZonePlacementGenerator;

impl ZonePlacementGenerator {
    fn zones(params: &GeneratorParams) -> Result<Vec<String>> {
        Ok(params.get_vec_string("zones")?.unwrap_or_default())
    }
}

impl Generator for ZonePlacementGenerator {
    fn name(&self) -> &'static str {
        "zone_placement"
    }

    fn description(&self) -> &'static str {
        "Availability-zone placement fragment for zone-spanning VM deployments"
    }

    fn required_params(&self) -> &[&'static str] {
        &["zones"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let zones = match Self::zones(params) {
            Ok(z) => z,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        if zones.is_empty() {
            report.error("zones must list at least one availability zone");
            return report;
        }

        for zone in &zones {
            if !matches!(zone.as_str(), "1" | "2" | "3") {
                report.error(format!("zone '{}' is not a valid zone (1, 2, or 3)", zone));
            }
        }

        let mut unique = zones.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != zones.len() {
            report.error("zones must not contain duplicates");
        }

        if unique.len() == 1 {
            report.recommend(
                "spreading across two or more zones protects against datacenter-level failure",
            );
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let mut zones = Self::zones(params)?;
        zones.sort_unstable();

        Ok(json!({
            "zones": zones,
            "placement": {
                "zoneRedundant": zones.len() > 1,
                "zoneCount": zones.len(),
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), json!("web-avset"));
        params.insert("location".to_string(), json!("eastus"));
        params
    }

    #[test]
    fn test_availability_set_defaults() {
        let gen = AvailabilitySetGenerator;
        let params = base_params();

        assert!(gen.validate(&params).is_valid);

        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["type"], "Microsoft.Compute/availabilitySets");
        assert_eq!(resource["apiVersion"], API_VERSION);
        assert_eq!(resource["sku"]["name"], "Aligned");
        assert_eq!(resource["properties"]["platformFaultDomainCount"], 2);
        assert_eq!(resource["properties"]["platformUpdateDomainCount"], 5);
    }

    #[test]
    fn test_availability_set_domain_bounds() {
        let gen = AvailabilitySetGenerator;

        let mut params = base_params();
        params.insert("fault_domains".to_string(), json!(4));
        let report = gen.validate(&params);
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("fault_domains"));

        let mut params = base_params();
        params.insert("update_domains".to_string(), json!(21));
        assert!(!gen.validate(&params).is_valid);

        let mut params = base_params();
        params.insert("update_domains".to_string(), json!(0));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_availability_set_single_fault_domain_warns() {
        let gen = AvailabilitySetGenerator;
        let mut params = base_params();
        params.insert("fault_domains".to_string(), json!(1));

        let report = gen.validate(&params);
        assert!(report.is_valid);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_availability_set_missing_required() {
        let gen = AvailabilitySetGenerator;
        let params = GeneratorParams::new();
        assert!(!gen.validate(&params).is_valid);
        assert!(gen.generate(&params).is_err());
    }

    #[test]
    fn test_zone_placement_valid() {
        let gen = ZonePlacementGenerator;
        let mut params = GeneratorParams::new();
        params.insert("zones".to_string(), json!(["2", "1"]));

        assert!(gen.validate(&params).is_valid);

        let fragment = gen.generate(&params).unwrap();
        assert_eq!(fragment["zones"], json!(["1", "2"]));
        assert_eq!(fragment["placement"]["zoneRedundant"], true);
    }

    #[test]
    fn test_zone_placement_rejects_bad_zone() {
        let gen = ZonePlacementGenerator;
        let mut params = GeneratorParams::new();
        params.insert("zones".to_string(), json!(["1", "4"]));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_zone_placement_rejects_duplicates() {
        let gen = ZonePlacementGenerator;
        let mut params = GeneratorParams::new();
        params.insert("zones".to_string(), json!(["1", "1"]));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_zone_placement_single_zone_recommends_spread() {
        let gen = ZonePlacementGenerator;
        let mut params = GeneratorParams::new();
        params.insert("zones".to_string(), json!(["3"]));

        let report = gen.validate(&params);
        assert!(report.is_valid);
        assert!(!report.recommendations.is_empty());
    }
}
