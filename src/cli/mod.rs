//! CLI module for vmforge
//!
//! Argument parsing, configuration loading, and subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// vmforge - Azure VM infrastructure template generator
///
/// Generates ARM JSON resource definitions for VM availability, backup,
/// monitoring, and scaling infrastructure.
#[derive(Parser, Debug, Clone)]
#[command(name = "vmforge")]
#[command(version)]
#[command(about = "Azure VM infrastructure template generator", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "VMFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Text,
    /// Bare resource JSON for scripting
    Json,
    /// Full ARM deployment template document
    Template,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a single generator
    Generate(commands::generate::GenerateArgs),

    /// List the generator catalog
    List,

    /// Generate vault, policy, and protected-item resources for VM backup
    #[command(name = "configure-backup")]
    ConfigureBackup(commands::backup::ConfigureBackupArgs),

    /// Validate a VHD file against Azure Marketplace rules
    #[command(name = "validate-vhd")]
    ValidateVhd(commands::vhd::ValidateVhdArgs),

    /// Recovery Services vault cleanup operations
    Cleanup(commands::cleanup::CleanupArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json | OutputFormat::Template)
    }
}
