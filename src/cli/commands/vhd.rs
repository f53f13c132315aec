//! `validate-vhd` subcommand.

use crate::cli::commands::CommandContext;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use vmforge::error::{Error, Result};
use vmforge::vhd;

/// Arguments for the validate-vhd command
#[derive(Parser, Debug, Clone)]
pub struct ValidateVhdArgs {
    /// Path to the VHD file
    pub path: PathBuf,
}

impl ValidateVhdArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let (footer, report) = vhd::validate_file(&self.path)?;

        if ctx.is_json_format() {
            ctx.output.json(&json!({
                "path": self.path,
                "disk_type": footer.disk_type.as_str(),
                "virtual_size_bytes": footer.current_size,
                "checksum_valid": footer.checksum_valid(),
                "report": report,
            }));
        } else {
            ctx.output.banner("VHD VALIDATION");
            ctx.output.info(&format!("file:         {}", self.path.display()));
            ctx.output
                .info(&format!("disk type:    {}", footer.disk_type.as_str()));
            ctx.output.info(&format!(
                "virtual size: {} bytes ({:.1} GiB)",
                footer.current_size,
                footer.current_size as f64 / (1024.0 * 1024.0 * 1024.0)
            ));
            ctx.output.report(&report);
        }

        if report.is_valid {
            ctx.output
                .success("VHD meets the Azure Marketplace requirements");
            Ok(0)
        } else {
            Err(Error::validation_failed("validate_vhd", &report.errors))
        }
    }
}
