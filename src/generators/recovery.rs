//! Site Recovery replication policy generator.
//!
//! Emits a `Microsoft.RecoveryServices/vaults/replicationPolicies` child
//! resource for Azure-to-Azure disaster recovery.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `vault_name` | Yes | Parent Recovery Services vault |
//! | `name` | Yes | Replication policy name |
//! | `recovery_point_retention_hours` | No | Recovery point history, 0-72 (default: 24) |
//! | `app_consistent_frequency_minutes` | No | App-consistent snapshot cadence, 60-720 (default: 240) |
//! | `multi_vm_sync` | No | Coordinate snapshots across VM groups (default: true) |

use crate::arm::validate_resource_name;
use crate::error::Result;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Value};

const API_VERSION: &str = "2023-06-01";

const MAX_RETENTION_HOURS: u32 = 72;
const MIN_APP_CONSISTENT_MINUTES: u32 = 60;
const MAX_APP_CONSISTENT_MINUTES: u32 = 720;

#[derive(Debug, Clone)]
struct ReplicationPolicyConfig {
    vault_name: String,
    name: String,
    retention_hours: u32,
    app_consistent_minutes: u32,
    multi_vm_sync: bool,
}

impl ReplicationPolicyConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        Ok(Self {
            vault_name: params.get_string_required("vault_name")?,
            name: params.get_string_required("name")?,
            retention_hours: params
                .get_u32("recovery_point_retention_hours")?
                .unwrap_or(24),
            app_consistent_minutes: params
                .get_u32("app_consistent_frequency_minutes")?
                .unwrap_or(240),
            multi_vm_sync: params.get_bool_or("multi_vm_sync", true)?,
        })
    }
}

/// Generator for `Microsoft.RecoveryServices/vaults/replicationPolicies`
/// resources.
pub struct ReplicationPolicyGenerator;

impl Generator for ReplicationPolicyGenerator {
    fn name(&self) -> &'static str {
        "replication_policy"
    }

    fn description(&self) -> &'static str {
        "Azure-to-Azure replication policy with recovery point and snapshot cadence"
    }

    fn required_params(&self) -> &[&'static str] {
        &["vault_name", "name"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match ReplicationPolicyConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.vault_name, &mut report);
        validate_resource_name(&config.name, &mut report);

        if config.retention_hours > MAX_RETENTION_HOURS {
            report.error(format!(
                "recovery_point_retention_hours must be at most {}, got {}",
                MAX_RETENTION_HOURS, config.retention_hours
            ));
        }
        if !(MIN_APP_CONSISTENT_MINUTES..=MAX_APP_CONSISTENT_MINUTES)
            .contains(&config.app_consistent_minutes)
        {
            report.error(format!(
                "app_consistent_frequency_minutes must be between {} and {}, got {}",
                MIN_APP_CONSISTENT_MINUTES, MAX_APP_CONSISTENT_MINUTES,
                config.app_consistent_minutes
            ));
        }

        if config.retention_hours == 0 {
            report.warn("zero retention keeps only the latest recovery point");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = ReplicationPolicyConfig::from_params(params)?;

        Ok(json!({
            "type": "Microsoft.RecoveryServices/vaults/replicationPolicies",
            "apiVersion": API_VERSION,
            "name": format!("{}/{}", config.vault_name, config.name),
            "properties": {
                "providerSpecificInput": {
                    "instanceType": "A2A",
                    "recoveryPointHistory": config.retention_hours * 60,
                    "appConsistentFrequencyInMinutes": config.app_consistent_minutes,
                    "crashConsistentFrequencyInMinutes": 5,
                    "multiVmSyncStatus": if config.multi_vm_sync { "Enable" } else { "Disable" },
                },
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("vault_name".to_string(), json!("rsv-prod"));
        params.insert("name".to_string(), json!("a2a-24h"));
        params
    }

    #[test]
    fn test_replication_policy_defaults() {
        let gen = ReplicationPolicyGenerator;
        let params = base_params();

        assert!(gen.validate(&params).is_valid);
        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["name"], "rsv-prod/a2a-24h");
        let input = &resource["properties"]["providerSpecificInput"];
        assert_eq!(input["instanceType"], "A2A");
        // retention is stored in minutes
        assert_eq!(input["recoveryPointHistory"], 24 * 60);
        assert_eq!(input["appConsistentFrequencyInMinutes"], 240);
        assert_eq!(input["multiVmSyncStatus"], "Enable");
    }

    #[test]
    fn test_replication_policy_retention_bounds() {
        let gen = ReplicationPolicyGenerator;
        let mut params = base_params();
        params.insert("recovery_point_retention_hours".to_string(), json!(73));
        assert!(!gen.validate(&params).is_valid);

        params.insert("recovery_point_retention_hours".to_string(), json!(72));
        assert!(gen.validate(&params).is_valid);
    }

    #[test]
    fn test_replication_policy_zero_retention_warns() {
        let gen = ReplicationPolicyGenerator;
        let mut params = base_params();
        params.insert("recovery_point_retention_hours".to_string(), json!(0));

        let report = gen.validate(&params);
        assert!(report.is_valid);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_replication_policy_snapshot_bounds() {
        let gen = ReplicationPolicyGenerator;
        let mut params = base_params();
        params.insert("app_consistent_frequency_minutes".to_string(), json!(30));
        assert!(!gen.validate(&params).is_valid);

        params.insert("app_consistent_frequency_minutes".to_string(), json!(721));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_replication_policy_sync_disable() {
        let gen = ReplicationPolicyGenerator;
        let mut params = base_params();
        params.insert("multi_vm_sync".to_string(), json!(false));

        let resource = gen.generate(&params).unwrap();
        assert_eq!(
            resource["properties"]["providerSpecificInput"]["multiVmSyncStatus"],
            "Disable"
        );
    }
}
