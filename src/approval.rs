//! File-backed approval records for destructive vault operations.
//!
//! A destructive cleanup run must be preceded by a dry run. The dry run's
//! payload is hashed with SHA-256 and recorded on disk together with a TTL;
//! the destructive run only proceeds while a matching, unexpired record
//! exists. Records live under `~/.vmforge/approvals`, one JSON file per
//! approval, named by the first 12 hex characters of the payload hash.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the approval directory.
pub const APPROVAL_DIR_ENV: &str = "VMFORGE_APPROVAL_DIR";

const DEFAULT_TTL_MINUTES: i64 = 60;

/// One recorded approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Recovery Services vault the approval covers.
    pub vault: String,
    /// Resource group of the vault.
    pub resource_group: String,
    /// Subscription ID.
    pub subscription: String,
    /// SHA-256 of the dry-run payload, lowercase hex.
    pub payload_hash: String,
    /// Who approved the run.
    pub approver: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether this record authorizes a run against the given vault with
    /// the given payload hash.
    pub fn covers(&self, vault: &str, resource_group: &str, payload_hash: &str) -> bool {
        self.vault == vault
            && self.resource_group == resource_group
            && self.payload_hash == payload_hash
    }
}

/// Hash a dry-run payload the way approvals store it.
pub fn hash_payload(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Manager for the on-disk approval store.
pub struct ApprovalManager {
    dir: PathBuf,
    ttl: Duration,
}

impl ApprovalManager {
    /// Open the store at an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    /// Open the default store: `$VMFORGE_APPROVAL_DIR` if set, otherwise
    /// `~/.vmforge/approvals`.
    pub fn open_default() -> Result<Self> {
        if let Ok(dir) = std::env::var(APPROVAL_DIR_ENV) {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Config("cannot determine home directory for the approval store".to_string())
        })?;
        Ok(Self::new(home.join(".vmforge").join("approvals")))
    }

    /// Override the record TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, payload_hash: &str) -> PathBuf {
        let stem: String = payload_hash.chars().take(12).collect();
        self.dir.join(format!("{}.json", stem))
    }

    /// Record an approval for the given dry-run payload.
    pub fn record(
        &self,
        vault: &str,
        resource_group: &str,
        subscription: &str,
        payload: &str,
        approver: &str,
    ) -> Result<ApprovalRecord> {
        let now = Utc::now();
        let record = ApprovalRecord {
            vault: vault.to_string(),
            resource_group: resource_group.to_string(),
            subscription: subscription.to_string(),
            payload_hash: hash_payload(payload),
            approver: approver.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::approval_store(&self.dir, format!("cannot create store: {}", e)))?;

        let path = self.record_path(&record.payload_hash);
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)
            .map_err(|e| Error::approval_store(&path, format!("cannot write record: {}", e)))?;

        debug!(vault = %vault, path = %path.display(), "recorded approval");
        Ok(record)
    }

    /// Find an unexpired approval covering the given vault and payload.
    pub fn find_valid(
        &self,
        vault: &str,
        resource_group: &str,
        payload: &str,
    ) -> Result<Option<ApprovalRecord>> {
        let payload_hash = hash_payload(payload);
        let path = self.record_path(&payload_hash);
        if !path.exists() {
            return Ok(None);
        }

        let record = self.load(&path)?;
        if !record.covers(vault, resource_group, &payload_hash) {
            warn!(path = %path.display(), "approval record does not match the request");
            return Ok(None);
        }
        if record.is_expired(Utc::now()) {
            debug!(path = %path.display(), "approval record has expired");
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Remove the approval for the given payload, if present.
    pub fn revoke(&self, payload: &str) -> Result<bool> {
        let path = self.record_path(&hash_payload(payload));
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .map_err(|e| Error::approval_store(&path, format!("cannot remove record: {}", e)))?;
        Ok(true)
    }

    /// Delete every expired record. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::approval_store(&self.dir, format!("cannot read store: {}", e)))?;
        for entry in entries {
            let entry = entry
                .map_err(|e| Error::approval_store(&self.dir, format!("cannot read store: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Unreadable records count as expired.
            let expired = match self.load(&path) {
                Ok(record) => record.is_expired(now),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "removing unreadable approval record");
                    true
                }
            };
            if expired {
                fs::remove_file(&path).map_err(|e| {
                    Error::approval_store(&path, format!("cannot remove record: {}", e))
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// List every record in the store, expired or not.
    pub fn list(&self) -> Result<Vec<ApprovalRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::approval_store(&self.dir, format!("cannot read store: {}", e)))?;
        for entry in entries {
            let entry = entry
                .map_err(|e| Error::approval_store(&self.dir, format!("cannot read store: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            records.push(self.load(&path)?);
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn load(&self, path: &Path) -> Result<ApprovalRecord> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::approval_store(path, format!("cannot read record: {}", e)))?;
        let record = serde_json::from_str(&contents)?;
        Ok(record)
    }
}
