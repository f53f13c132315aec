//! TOML configuration.
//!
//! Configuration is looked up in order: an explicit `--config` path,
//! `vmforge.toml` in the working directory, then `~/.vmforge.toml`. A
//! missing file yields the defaults; a present but malformed file is an
//! error.
//!
//! ```toml
//! [defaults]
//! location = "eastus"
//! subscription = "00000000-0000-0000-0000-000000000000"
//!
//! [approvals]
//! ttl_minutes = 60
//!
//! [cleanup]
//! script = "/opt/vmforge/cleanup-vault.ps1"
//! shell = "pwsh"
//! ```

use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "vmforge.toml";

/// Config file name looked up in the home directory.
pub const HOME_CONFIG: &str = ".vmforge.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
    pub approvals: ApprovalsConfig,
    pub cleanup: CleanupConfig,
    pub colors: ColorsConfig,
    pub logging: LoggingConfig,
}

/// Default parameter values merged into every generator invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub location: Option<String>,
    pub subscription: Option<String>,
    pub resource_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalsConfig {
    /// Approval store directory; `~/.vmforge/approvals` when unset.
    pub dir: Option<PathBuf>,
    pub ttl_minutes: i64,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Path to the external cleanup script.
    pub script: Option<PathBuf>,
    /// PowerShell executable; probed when unset.
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive applied when `-v` flags are absent, e.g. `info`
    /// or `vmforge=debug`.
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from an explicit path or the default locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(HOME_CONFIG);
            if home_config.exists() {
                return Self::from_file(&home_config);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a specific config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}
