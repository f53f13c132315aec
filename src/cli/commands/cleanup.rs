//! `cleanup` subcommand.
//!
//! `cleanup vault` runs the external cleanup script. The default mode is a
//! dry run that prints what would be removed; `--approve-as` records an
//! approval for that dry run; `--execute` verifies the approval and runs
//! destructively after a confirmation prompt.

use crate::cli::commands::CommandContext;
use chrono::Duration;
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use vmforge::approval::ApprovalManager;
use vmforge::cleanup::{CleanupReport, CleanupRequest, CleanupRunner};
use vmforge::error::{Error, Result};

/// Arguments for the cleanup command
#[derive(Parser, Debug, Clone)]
pub struct CleanupArgs {
    #[command(subcommand)]
    pub target: CleanupTarget,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CleanupTarget {
    /// Remove stale recovery points from a Recovery Services vault
    Vault(VaultCleanupArgs),
}

/// Arguments for `cleanup vault`
#[derive(Parser, Debug, Clone)]
pub struct VaultCleanupArgs {
    /// Recovery Services vault name
    #[arg(long)]
    pub vault: String,

    /// Resource group of the vault
    #[arg(long = "resource-group")]
    pub resource_group: String,

    /// Subscription ID (falls back to the configured default)
    #[arg(long)]
    pub subscription: Option<String>,

    /// Only remove recovery points older than this many days
    #[arg(long = "older-than-days")]
    pub older_than_days: Option<u32>,

    /// Record an approval for this dry run under the given approver name
    #[arg(long = "approve-as")]
    pub approve_as: Option<String>,

    /// Run destructively; requires an unexpired approval for this dry run
    #[arg(long)]
    pub execute: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl CleanupArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        match &self.target {
            CleanupTarget::Vault(args) => args.execute(ctx),
        }
    }
}

impl VaultCleanupArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let subscription = self
            .subscription
            .clone()
            .or_else(|| ctx.config.defaults.subscription.clone())
            .ok_or_else(|| Error::MissingParameter("subscription".to_string()))?;

        let script = ctx.config.cleanup.script.clone().ok_or_else(|| {
            Error::Config("no cleanup script configured; set [cleanup] script".to_string())
        })?;

        let mut request = CleanupRequest::new(&self.vault, &self.resource_group, subscription);
        if let Some(days) = self.older_than_days {
            request = request.older_than_days(days);
        }

        let mut runner = CleanupRunner::new(script);
        if let Some(shell) = &ctx.config.cleanup.shell {
            runner = runner.with_shell(shell);
        }

        let approvals = self.approval_manager(ctx)?;

        ctx.output.banner("VAULT CLEANUP");
        let dry_report = runner.dry_run(&request)?;
        self.print_report(ctx, &dry_report);

        if let Some(approver) = &self.approve_as {
            let payload = dry_report.approval_payload()?;
            let record = approvals.record(
                &self.vault,
                &self.resource_group,
                &request.subscription,
                &payload,
                approver,
            )?;
            ctx.output.success(&format!(
                "approval recorded for {} item(s), expires {}",
                dry_report.items.len(),
                record.expires_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }

        if !self.execute {
            ctx.output
                .info("dry run only; re-run with --execute to remove the listed items");
            return Ok(0);
        }

        if dry_report.items.is_empty() {
            ctx.output.success("nothing to remove");
            return Ok(0);
        }

        if !self.yes && !self.confirm(&dry_report)? {
            ctx.output.info("aborted");
            return Ok(0);
        }

        let report = runner.execute(&request, &approvals)?;
        self.print_report(ctx, &report);
        ctx.output
            .success(&format!("{} recovery point(s) removed", report.removed));
        Ok(0)
    }

    fn approval_manager(&self, ctx: &CommandContext) -> Result<ApprovalManager> {
        let manager = match &ctx.config.approvals.dir {
            Some(dir) => ApprovalManager::new(dir),
            None => ApprovalManager::open_default()?,
        };
        Ok(manager.with_ttl(Duration::minutes(ctx.config.approvals.ttl_minutes)))
    }

    fn confirm(&self, report: &CleanupReport) -> Result<bool> {
        Confirm::new()
            .with_prompt(format!(
                "Permanently remove {} recovery point(s) from vault '{}'?",
                report.items.len(),
                self.vault
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Config(format!("cannot read confirmation: {}", e)))
    }

    fn print_report(&self, ctx: &CommandContext, report: &CleanupReport) {
        if ctx.is_json_format() {
            if let Ok(value) = serde_json::to_value(report) {
                ctx.output.json(&value);
            }
            return;
        }

        let mode = if report.dry_run { "would remove" } else { "removed" };
        ctx.output.section(&format!(
            "{} {} item(s) in vault {}",
            mode,
            report.items.len(),
            report.vault
        ));
        for item in &report.items {
            ctx.output.info(&format!("  {}", item));
        }
        for error in &report.errors {
            ctx.output.warning(error);
        }
    }
}
