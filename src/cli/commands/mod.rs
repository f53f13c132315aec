//! Subcommands module for the vmforge CLI.

pub mod backup;
pub mod cleanup;
pub mod generate;
pub mod vhd;

use crate::cli::output::OutputFormatter;
use crate::cli::{Cli, OutputFormat};
use std::sync::Arc;
use vmforge::config::Config;
use vmforge::generators::GeneratorRegistry;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Generator catalog
    pub registry: Arc<GeneratorRegistry>,
    /// Requested output format
    pub format: OutputFormat,
    /// Verbosity level
    pub verbosity: u8,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            registry: Arc::new(GeneratorRegistry::with_builtins()),
            format: cli.output,
            verbosity: cli.verbosity(),
        }
    }

    /// Whether the requested format is machine-readable.
    pub fn is_json_format(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Template)
    }

    /// Emit a generated resource in the requested format.
    pub fn emit_resource(&self, resource: serde_json::Value) {
        let value = match self.format {
            OutputFormat::Template => vmforge::arm::wrap_resource(resource),
            _ => resource,
        };
        self.output.json(&value);
    }

    /// Emit a set of resources in the requested format.
    pub fn emit_resources(&self, resources: Vec<serde_json::Value>) {
        match self.format {
            OutputFormat::Template => {
                let doc = vmforge::arm::TemplateBuilder::new()
                    .resources(resources)
                    .build();
                self.output.json(&doc);
            }
            _ => self.output.json(&serde_json::Value::Array(resources)),
        }
    }
}
