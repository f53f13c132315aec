//! Recovery Services vault, backup policy, and protected item generators.
//!
//! ## RecoveryVaultGenerator
//!
//! Emits a `Microsoft.RecoveryServices/vaults` resource.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Vault name |
//! | `location` | Yes | Azure region |
//! | `storage_redundancy` | No | LocallyRedundant, GeoRedundant, ZoneRedundant (default: GeoRedundant) |
//! | `soft_delete` | No | Enable soft delete (default: true) |
//! | `tags` | No | Resource tags |
//!
//! ## BackupPolicyGenerator
//!
//! Emits a `Microsoft.RecoveryServices/vaults/backupPolicies` resource for
//! IaaS VM backup. Retention starts from a preset (`production`,
//! `development`, `long-term`) and individual fields can be overridden.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Policy name |
//! | `vault` | Yes | Parent vault name |
//! | `preset` | No | production, development, long-term (default: production) |
//! | `backup_time` | No | Daily backup time `HH:MM` UTC (default: 02:00) |
//! | `timezone` | No | Schedule timezone (default: UTC) |
//! | `daily_retention_days` | No | Override, 7-9999 |
//! | `weekly_retention_weeks` | No | Override, 1-5163 (0 disables) |
//! | `monthly_retention_months` | No | Override, 1-1188 (0 disables) |
//! | `yearly_retention_years` | No | Override, 1-10 (0 disables) |
//! | `instant_restore_days` | No | Snapshot retention, 1-5 |
//!
//! ## ProtectedItemGenerator
//!
//! Emits the protected-item association that enrolls a VM into a policy.

use crate::arm::{validate_location, validate_resource_name, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Value};
use std::sync::OnceLock;

const API_VERSION: &str = "2023-04-01";

// Azure-documented retention bounds for IaaS VM policies.
const DAILY_RETENTION: (u32, u32) = (7, 9999);
const WEEKLY_RETENTION: (u32, u32) = (1, 5163);
const MONTHLY_RETENTION: (u32, u32) = (1, 1188);
const YEARLY_RETENTION: (u32, u32) = (1, 10);
const INSTANT_RESTORE: (u32, u32) = (1, 5);

/// Retention schedule for a backup policy.
///
/// A `None` tier means that tier is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionSchedule {
    pub daily_days: u32,
    pub weekly_weeks: Option<u32>,
    pub monthly_months: Option<u32>,
    pub yearly_years: Option<u32>,
    pub instant_restore_days: u32,
}

/// Backup policy preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyPreset {
    Production,
    Development,
    LongTerm,
}

impl PolicyPreset {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "long-term" | "longterm" => Ok(Self::LongTerm),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid preset '{}'. Valid presets: production, development, long-term",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::LongTerm => "long-term",
        }
    }

    /// Baseline retention for the preset. Presets stay inside the validated
    /// ranges so a preset plus override is validated exactly once.
    pub fn retention(&self) -> RetentionSchedule {
        match self {
            Self::Production => RetentionSchedule {
                daily_days: 30,
                weekly_weeks: Some(12),
                monthly_months: Some(12),
                yearly_years: None,
                instant_restore_days: 2,
            },
            Self::Development => RetentionSchedule {
                daily_days: 7,
                weekly_weeks: None,
                monthly_months: None,
                yearly_years: None,
                instant_restore_days: 1,
            },
            Self::LongTerm => RetentionSchedule {
                daily_days: 90,
                weekly_weeks: Some(104),
                monthly_months: Some(60),
                yearly_years: Some(10),
                instant_restore_days: 2,
            },
        }
    }
}

fn backup_time_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap())
}

/// Parsed vault configuration.
#[derive(Debug, Clone)]
struct VaultConfig {
    name: String,
    location: String,
    storage_redundancy: String,
    soft_delete: bool,
    tags: serde_json::Map<String, Value>,
}

impl VaultConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let storage_redundancy = params
            .get_string("storage_redundancy")?
            .unwrap_or_else(|| "GeoRedundant".to_string());
        if !matches!(
            storage_redundancy.as_str(),
            "LocallyRedundant" | "GeoRedundant" | "ZoneRedundant"
        ) {
            return Err(Error::InvalidParameter(format!(
                "Invalid storage_redundancy '{}'. Valid values: LocallyRedundant, \
                 GeoRedundant, ZoneRedundant",
                storage_redundancy
            )));
        }

        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            storage_redundancy,
            soft_delete: params.get_bool_or("soft_delete", true)?,
            tags: extract_tags(params),
        })
    }
}

/// Generator for `Microsoft.RecoveryServices/vaults` resources.
pub struct RecoveryVaultGenerator;

impl Generator for RecoveryVaultGenerator {
    fn name(&self) -> &'static str {
        "recovery_vault"
    }

    fn description(&self) -> &'static str {
        "Recovery Services vault with storage redundancy and soft delete settings"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match VaultConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        if !config.soft_delete {
            report.warn("disabling soft delete removes the 14-day deleted-backup safety net");
        }
        if config.storage_redundancy == "LocallyRedundant" {
            report.recommend(
                "geo-redundant vault storage survives a regional outage; LRS does not",
            );
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = VaultConfig::from_params(params)?;

        Ok(json!({
            "type": "Microsoft.RecoveryServices/vaults",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "sku": { "name": "RS0", "tier": "Standard" },
            "properties": {
                "securitySettings": {
                    "softDeleteSettings": {
                        "softDeleteState": if config.soft_delete { "Enabled" } else { "Disabled" },
                    },
                },
                "redundancySettings": {
                    "standardTierStorageRedundancy": config.storage_redundancy,
                },
            },
            "tags": Value::Object(config.tags),
        }))
    }
}

/// Parsed backup policy configuration.
#[derive(Debug, Clone)]
struct BackupPolicyConfig {
    name: String,
    vault: String,
    preset: PolicyPreset,
    backup_time: String,
    timezone: String,
    retention: RetentionSchedule,
}

impl BackupPolicyConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let preset = match params.get_string("preset")? {
            Some(s) => PolicyPreset::from_str(&s)?,
            None => PolicyPreset::Production,
        };

        let mut retention = preset.retention();
        if let Some(days) = params.get_u32("daily_retention_days")? {
            retention.daily_days = days;
        }
        // Override value 0 disables the tier.
        if let Some(weeks) = params.get_u32("weekly_retention_weeks")? {
            retention.weekly_weeks = (weeks > 0).then_some(weeks);
        }
        if let Some(months) = params.get_u32("monthly_retention_months")? {
            retention.monthly_months = (months > 0).then_some(months);
        }
        if let Some(years) = params.get_u32("yearly_retention_years")? {
            retention.yearly_years = (years > 0).then_some(years);
        }
        if let Some(days) = params.get_u32("instant_restore_days")? {
            retention.instant_restore_days = days;
        }

        Ok(Self {
            name: params.get_string_required("name")?,
            vault: params.get_string_required("vault")?,
            preset,
            backup_time: params
                .get_string("backup_time")?
                .unwrap_or_else(|| "02:00".to_string()),
            timezone: params
                .get_string("timezone")?
                .unwrap_or_else(|| "UTC".to_string()),
            retention,
        })
    }
}

/// Generator for `Microsoft.RecoveryServices/vaults/backupPolicies`.
pub struct BackupPolicyGenerator;

impl BackupPolicyGenerator {
    fn check_range(
        report: &mut ValidationReport,
        field: &str,
        value: u32,
        (min, max): (u32, u32),
    ) {
        if !(min..=max).contains(&value) {
            report.error(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            ));
        }
    }
}

impl Generator for BackupPolicyGenerator {
    fn name(&self) -> &'static str {
        "backup_policy"
    }

    fn description(&self) -> &'static str {
        "IaaS VM backup policy from a preset with retention overrides"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "vault"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match BackupPolicyConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_resource_name(&config.vault, &mut report);

        if !backup_time_re().is_match(&config.backup_time) {
            report.error(format!(
                "backup_time '{}' must be HH:MM (24-hour)",
                config.backup_time
            ));
        }

        let r = &config.retention;
        Self::check_range(&mut report, "daily_retention_days", r.daily_days, DAILY_RETENTION);
        if let Some(weeks) = r.weekly_weeks {
            Self::check_range(&mut report, "weekly_retention_weeks", weeks, WEEKLY_RETENTION);
        }
        if let Some(months) = r.monthly_months {
            Self::check_range(
                &mut report,
                "monthly_retention_months",
                months,
                MONTHLY_RETENTION,
            );
        }
        if let Some(years) = r.yearly_years {
            Self::check_range(&mut report, "yearly_retention_years", years, YEARLY_RETENTION);
        }
        Self::check_range(
            &mut report,
            "instant_restore_days",
            r.instant_restore_days,
            INSTANT_RESTORE,
        );

        if config.preset == PolicyPreset::Production && r.weekly_weeks.is_none() {
            report.warn("production workloads usually keep a weekly retention tier");
        }
        if r.yearly_years.is_none() && config.preset == PolicyPreset::LongTerm {
            report.warn("long-term preset with yearly retention disabled loses its point");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = BackupPolicyConfig::from_params(params)?;
        let run_time = format!("2023-01-01T{}:00Z", config.backup_time);
        let r = &config.retention;

        let mut retention_policy = serde_json::Map::new();
        retention_policy.insert(
            "retentionPolicyType".to_string(),
            json!("LongTermRetentionPolicy"),
        );
        retention_policy.insert(
            "dailySchedule".to_string(),
            json!({
                "retentionTimes": [&run_time],
                "retentionDuration": { "count": r.daily_days, "durationType": "Days" },
            }),
        );
        if let Some(weeks) = r.weekly_weeks {
            retention_policy.insert(
                "weeklySchedule".to_string(),
                json!({
                    "daysOfTheWeek": ["Sunday"],
                    "retentionTimes": [&run_time],
                    "retentionDuration": { "count": weeks, "durationType": "Weeks" },
                }),
            );
        }
        if let Some(months) = r.monthly_months {
            retention_policy.insert(
                "monthlySchedule".to_string(),
                json!({
                    "retentionScheduleFormatType": "Weekly",
                    "retentionScheduleWeekly": {
                        "daysOfTheWeek": ["Sunday"],
                        "weeksOfTheMonth": ["First"],
                    },
                    "retentionTimes": [&run_time],
                    "retentionDuration": { "count": months, "durationType": "Months" },
                }),
            );
        }
        if let Some(years) = r.yearly_years {
            retention_policy.insert(
                "yearlySchedule".to_string(),
                json!({
                    "retentionScheduleFormatType": "Weekly",
                    "monthsOfYear": ["January"],
                    "retentionScheduleWeekly": {
                        "daysOfTheWeek": ["Sunday"],
                        "weeksOfTheMonth": ["First"],
                    },
                    "retentionTimes": [&run_time],
                    "retentionDuration": { "count": years, "durationType": "Years" },
                }),
            );
        }

        Ok(json!({
            "type": "Microsoft.RecoveryServices/vaults/backupPolicies",
            "apiVersion": API_VERSION,
            "name": format!("{}/{}", config.vault, config.name),
            "properties": {
                "backupManagementType": "AzureIaasVM",
                "policyType": "V2",
                "instantRpRetentionRangeInDays": r.instant_restore_days,
                "timeZone": config.timezone,
                "schedulePolicy": {
                    "schedulePolicyType": "SimpleSchedulePolicyV2",
                    "scheduleRunFrequency": "Daily",
                    "dailySchedule": { "scheduleRunTimes": [&run_time] },
                },
                "retentionPolicy": Value::Object(retention_policy),
            },
        }))
    }
}

/// Parsed protected item configuration.
#[derive(Debug, Clone)]
struct ProtectedItemConfig {
    vault: String,
    vm_name: String,
    resource_group: String,
    policy: String,
}

impl ProtectedItemConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        Ok(Self {
            vault: params.get_string_required("vault")?,
            vm_name: params.get_string_required("vm_name")?,
            resource_group: params.get_string_required("resource_group")?,
            policy: params.get_string_required("policy")?,
        })
    }
}

/// Generator for the protected-item association enrolling a VM into a policy.
pub struct ProtectedItemGenerator;

impl Generator for ProtectedItemGenerator {
    fn name(&self) -> &'static str {
        "protected_item"
    }

    fn description(&self) -> &'static str {
        "Protected-item association that enrolls a VM into a backup policy"
    }

    fn required_params(&self) -> &[&'static str] {
        &["vault", "vm_name", "resource_group", "policy"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match ProtectedItemConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.vault, &mut report);
        validate_resource_name(&config.vm_name, &mut report);
        validate_resource_name(&config.policy, &mut report);

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = ProtectedItemConfig::from_params(params)?;

        // Container and item names follow the IaaS VM fabric convention.
        let container = format!(
            "iaasvmcontainer;iaasvmcontainerv2;{};{}",
            config.resource_group, config.vm_name
        );
        let item = format!(
            "vm;iaasvmcontainerv2;{};{}",
            config.resource_group, config.vm_name
        );

        Ok(json!({
            "type": "Microsoft.RecoveryServices/vaults/backupFabrics/protectionContainers/protectedItems",
            "apiVersion": API_VERSION,
            "name": format!("{}/Azure/{}/{}", config.vault, container, item),
            "properties": {
                "protectedItemType": "Microsoft.Compute/virtualMachines",
                "policyId": format!(
                    "[resourceId('Microsoft.RecoveryServices/vaults/backupPolicies', '{}', '{}')]",
                    config.vault, config.policy
                ),
                "sourceResourceId": format!(
                    "[resourceId('Microsoft.Compute/virtualMachines', '{}')]",
                    config.vm_name
                ),
            },
        }))
    }
}
