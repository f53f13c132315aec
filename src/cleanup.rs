//! Recovery Services vault cleanup runner.
//!
//! The actual deletion logic lives in an external PowerShell script; this
//! module builds its argument list from a validated request, spawns it,
//! and interprets the exit code and stdout JSON. Destructive runs are gated
//! behind the approval store: the fresh dry-run report must hash to a
//! recorded, unexpired approval before the script runs without `-DryRun`.

use crate::approval::{self, ApprovalManager};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Shells tried in order when none is configured.
const SHELL_CANDIDATES: &[&str] = &["pwsh", "powershell"];

/// A validated cleanup request.
#[derive(Debug, Clone)]
pub struct CleanupRequest {
    pub vault: String,
    pub resource_group: String,
    pub subscription: String,
    /// Only remove recovery points older than this many days, if set.
    pub older_than_days: Option<u32>,
}

impl CleanupRequest {
    pub fn new(
        vault: impl Into<String>,
        resource_group: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Self {
        Self {
            vault: vault.into(),
            resource_group: resource_group.into(),
            subscription: subscription.into(),
            older_than_days: None,
        }
    }

    pub fn older_than_days(mut self, days: u32) -> Self {
        self.older_than_days = Some(days);
        self
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("vault", &self.vault),
            ("resource_group", &self.resource_group),
            ("subscription", &self.subscription),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Script arguments for this request.
    fn script_args(&self, script: &Path, dry_run: bool) -> Vec<String> {
        let mut args = vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-File".to_string(),
            script.display().to_string(),
            "-VaultName".to_string(),
            self.vault.clone(),
            "-ResourceGroupName".to_string(),
            self.resource_group.clone(),
            "-SubscriptionId".to_string(),
            self.subscription.clone(),
        ];
        if let Some(days) = self.older_than_days {
            args.push("-OlderThanDays".to_string());
            args.push(days.to_string());
        }
        if dry_run {
            args.push("-DryRun".to_string());
        }
        args
    }
}

/// Parsed stdout of the cleanup script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub vault: String,
    #[serde(default)]
    pub dry_run: bool,
    /// Recovery point identifiers the script removed (or would remove).
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub removed: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CleanupReport {
    /// Stable serialization used as the approval payload.
    pub fn approval_payload(&self) -> Result<String> {
        // dry_run/removed vary between the dry and destructive pass; hash
        // only what identifies the work.
        let identity = serde_json::json!({
            "vault": self.vault,
            "items": self.items,
        });
        Ok(serde_json::to_string(&identity)?)
    }
}

/// Runner for the external cleanup script.
pub struct CleanupRunner {
    script: PathBuf,
    shell: Option<String>,
}

impl CleanupRunner {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            shell: None,
        }
    }

    /// Use a specific shell instead of probing for one.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Resolve the PowerShell executable: the configured shell if set,
    /// otherwise the first candidate that answers `-Version`.
    fn resolve_shell(&self) -> Result<String> {
        if let Some(shell) = &self.shell {
            return Ok(shell.clone());
        }
        for candidate in SHELL_CANDIDATES {
            let probe = Command::new(candidate).arg("-Version").output();
            if matches!(&probe, Ok(out) if out.status.success()) {
                debug!(shell = candidate, "resolved PowerShell executable");
                return Ok((*candidate).to_string());
            }
        }
        Err(Error::CleanupShellNotFound(SHELL_CANDIDATES.join(", ")))
    }

    /// Run the script in dry-run mode and parse its report.
    pub fn dry_run(&self, request: &CleanupRequest) -> Result<CleanupReport> {
        self.invoke(request, true)
    }

    /// Run the script destructively. Requires an unexpired approval whose
    /// payload hash matches a fresh dry run of the same request.
    pub fn execute(
        &self,
        request: &CleanupRequest,
        approvals: &ApprovalManager,
    ) -> Result<CleanupReport> {
        let dry_report = self.dry_run(request)?;
        let payload = dry_report.approval_payload()?;

        let approval = approvals
            .find_valid(&request.vault, &request.resource_group, &payload)?
            .ok_or_else(|| {
                Error::approval_required(
                    &request.vault,
                    format!(
                        "no valid approval for payload hash {}; run a dry run and approve it first",
                        &approval::hash_payload(&payload)[..12]
                    ),
                )
            })?;

        info!(
            vault = %request.vault,
            approver = %approval.approver,
            items = dry_report.items.len(),
            "approval verified, executing cleanup"
        );
        self.invoke(request, false)
    }

    fn invoke(&self, request: &CleanupRequest, dry_run: bool) -> Result<CleanupReport> {
        request.validate()?;
        if !self.script.exists() {
            return Err(Error::FileNotFound(self.script.clone()));
        }

        let shell = self.resolve_shell()?;
        let args = request.script_args(&self.script, dry_run);
        debug!(shell = %shell, dry_run, "spawning cleanup script");

        let output = Command::new(&shell)
            .args(&args)
            .output()
            .map_err(|e| Error::CleanupFailed {
                code: -1,
                message: format!("cannot spawn {}: {}", shell, e),
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(code, "cleanup script failed");
            return Err(Error::CleanupFailed {
                code,
                message: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report: CleanupReport = serde_json::from_str(stdout.trim())
            .map_err(|e| Error::CleanupOutput(e.to_string()))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn request() -> CleanupRequest {
        CleanupRequest::new("rsv-prod", "rg-prod", "sub1")
    }

    /// Stand-in shell that ignores its arguments and emits a fixed report,
    /// so the tests run without PowerShell installed.
    fn fake_runner(dir: &TempDir, report_json: &str, exit_code: i32) -> CleanupRunner {
        use std::os::unix::fs::PermissionsExt;

        let shell = dir.path().join("pwsh");
        fs::write(
            &shell,
            format!("#!/bin/sh\necho '{}'\nexit {}\n", report_json, exit_code),
        )
        .unwrap();
        fs::set_permissions(&shell, fs::Permissions::from_mode(0o755)).unwrap();

        let script = dir.path().join("cleanup.ps1");
        fs::write(&script, "# placeholder\n").unwrap();

        CleanupRunner::new(&script).with_shell(shell.display().to_string())
    }

    const DRY_REPORT: &str =
        r#"{"vault":"rsv-prod","dry_run":true,"items":["rp-1","rp-2"],"removed":0}"#;

    #[test]
    fn test_request_validation() {
        let req = CleanupRequest::new("", "rg", "sub");
        assert!(req.validate().is_err());
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_script_args_shape() {
        let req = request().older_than_days(30);
        let args = req.script_args(Path::new("/opt/cleanup.ps1"), true);
        assert_eq!(args[0], "-NoProfile");
        assert!(args.contains(&"-VaultName".to_string()));
        assert!(args.contains(&"rsv-prod".to_string()));
        assert!(args.contains(&"-OlderThanDays".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-DryRun"));

        let args = req.script_args(Path::new("/opt/cleanup.ps1"), false);
        assert!(!args.contains(&"-DryRun".to_string()));
    }

    #[test]
    fn test_dry_run_parses_report() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, DRY_REPORT, 0);

        let report = runner.dry_run(&request()).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.items, vec!["rp-1", "rp-2"]);
    }

    #[test]
    fn test_nonzero_exit_maps_to_error() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, DRY_REPORT, 3);

        let err = runner.dry_run(&request()).unwrap_err();
        assert!(matches!(err, Error::CleanupFailed { code: 3, .. }));
    }

    #[test]
    fn test_garbage_stdout_maps_to_error() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, "deleting things...", 0);

        let err = runner.dry_run(&request()).unwrap_err();
        assert!(matches!(err, Error::CleanupOutput(_)));
    }

    #[test]
    fn test_missing_script() {
        let runner = CleanupRunner::new("/nonexistent/cleanup.ps1").with_shell("sh");
        let err = runner.dry_run(&request()).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_execute_requires_approval() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, DRY_REPORT, 0);
        let approvals = ApprovalManager::new(dir.path().join("approvals"));

        let err = runner.execute(&request(), &approvals).unwrap_err();
        assert!(matches!(err, Error::ApprovalRequired { .. }));
    }

    #[test]
    fn test_execute_with_valid_approval() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, DRY_REPORT, 0);
        let approvals = ApprovalManager::new(dir.path().join("approvals"));

        let dry = runner.dry_run(&request()).unwrap();
        let payload = dry.approval_payload().unwrap();
        approvals
            .record("rsv-prod", "rg-prod", "sub1", &payload, "alice")
            .unwrap();

        let report = runner.execute(&request(), &approvals).unwrap();
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn test_execute_rejects_expired_approval() {
        let dir = TempDir::new().unwrap();
        let runner = fake_runner(&dir, DRY_REPORT, 0);
        let approvals =
            ApprovalManager::new(dir.path().join("approvals")).with_ttl(Duration::minutes(-1));

        let dry = runner.dry_run(&request()).unwrap();
        let payload = dry.approval_payload().unwrap();
        approvals
            .record("rsv-prod", "rg-prod", "sub1", &payload, "alice")
            .unwrap();

        let err = runner.execute(&request(), &approvals).unwrap_err();
        assert!(matches!(err, Error::ApprovalRequired { .. }));
    }

    #[test]
    fn test_approval_payload_ignores_run_mode() {
        let dry: CleanupReport = serde_json::from_str(DRY_REPORT).unwrap();
        let wet: CleanupReport = serde_json::from_str(
            r#"{"vault":"rsv-prod","dry_run":false,"items":["rp-1","rp-2"],"removed":2}"#,
        )
        .unwrap();
        assert_eq!(
            dry.approval_payload().unwrap(),
            wet.approval_payload().unwrap()
        );
    }
}
