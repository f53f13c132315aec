//! `configure-backup` subcommand.
//!
//! Assembles the full backup resource set for one or more VMs: the Recovery
//! Services vault, a backup policy from a preset plus optional retention
//! overrides, and one protected item per VM.

use crate::cli::commands::CommandContext;
use clap::Parser;
use serde_json::json;
use vmforge::error::{Error, Result};
use vmforge::generators::GeneratorParams;

/// Arguments for the configure-backup command
#[derive(Parser, Debug, Clone)]
pub struct ConfigureBackupArgs {
    /// Recovery Services vault name
    #[arg(long)]
    pub vault: String,

    /// Resource group holding the VMs
    #[arg(long = "resource-group")]
    pub resource_group: String,

    /// VM to protect; repeatable
    #[arg(long = "vm", required = true, action = clap::ArgAction::Append)]
    pub vms: Vec<String>,

    /// Azure region (falls back to the configured default)
    #[arg(long)]
    pub location: Option<String>,

    /// Backup policy name
    #[arg(long = "policy-name", default_value = "vmforge-daily")]
    pub policy_name: String,

    /// Policy preset: production, development, long-term
    #[arg(long, default_value = "production")]
    pub preset: String,

    /// Daily retention override in days
    #[arg(long = "daily-retention")]
    pub daily_retention: Option<u32>,

    /// Weekly retention override in weeks (0 disables the tier)
    #[arg(long = "weekly-retention")]
    pub weekly_retention: Option<u32>,

    /// Monthly retention override in months (0 disables the tier)
    #[arg(long = "monthly-retention")]
    pub monthly_retention: Option<u32>,

    /// Yearly retention override in years (0 disables the tier)
    #[arg(long = "yearly-retention")]
    pub yearly_retention: Option<u32>,

    /// Instant restore retention override in days
    #[arg(long = "instant-restore")]
    pub instant_restore: Option<u32>,

    /// Daily backup time, 24h HH:MM UTC
    #[arg(long = "backup-time")]
    pub backup_time: Option<String>,
}

impl ConfigureBackupArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let location = self
            .location
            .clone()
            .or_else(|| ctx.config.defaults.location.clone())
            .ok_or_else(|| Error::MissingParameter("location".to_string()))?;

        ctx.output.banner("CONFIGURE BACKUP");
        ctx.output.info(&format!(
            "vault {} in {}, {} VM(s), preset {}",
            self.vault,
            location,
            self.vms.len(),
            self.preset
        ));

        let mut resources = Vec::new();
        resources.push(self.run(ctx, "recovery_vault", self.vault_params(&location))?);
        resources.push(self.run(ctx, "backup_policy", self.policy_params(&location))?);
        for vm in &self.vms {
            resources.push(self.run(ctx, "protected_item", self.protected_item_params(vm))?);
        }

        ctx.emit_resources(resources);
        ctx.output
            .success(&format!("{} resources generated", 2 + self.vms.len()));
        Ok(0)
    }

    fn run(
        &self,
        ctx: &CommandContext,
        generator: &str,
        params: GeneratorParams,
    ) -> Result<serde_json::Value> {
        let report = ctx.registry.validate(generator, &params)?;
        ctx.output.report(&report);
        if !report.is_valid {
            return Err(Error::validation_failed(generator, &report.errors));
        }
        ctx.registry.run(generator, &params)
    }

    fn vault_params(&self, location: &str) -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), json!(self.vault));
        params.insert("location".to_string(), json!(location));
        params
    }

    fn policy_params(&self, location: &str) -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), json!(self.policy_name));
        params.insert("vault".to_string(), json!(self.vault));
        params.insert("location".to_string(), json!(location));
        params.insert("preset".to_string(), json!(self.preset));

        for (key, value) in [
            ("daily_retention_days", self.daily_retention),
            ("weekly_retention_weeks", self.weekly_retention),
            ("monthly_retention_months", self.monthly_retention),
            ("yearly_retention_years", self.yearly_retention),
            ("instant_restore_days", self.instant_restore),
        ] {
            if let Some(v) = value {
                params.insert(key.to_string(), json!(v));
            }
        }
        if let Some(time) = &self.backup_time {
            params.insert("backup_time".to_string(), json!(time));
        }
        params
    }

    fn protected_item_params(&self, vm: &str) -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("vault".to_string(), json!(self.vault));
        params.insert("vm_name".to_string(), json!(vm));
        params.insert("resource_group".to_string(), json!(self.resource_group));
        params.insert("policy".to_string(), json!(self.policy_name));
        params
    }
}
