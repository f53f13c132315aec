//! `generate` and `list` subcommands.

use crate::cli::commands::CommandContext;
use clap::Parser;
use std::path::PathBuf;
use vmforge::error::{Error, ErrorContext, Result};
use vmforge::generators::GeneratorParams;

/// Arguments for the generate command
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Generator name (see `vmforge list`)
    pub generator: String,

    /// Generator parameter as key=value; repeatable. Values parse as JSON
    /// where possible, falling back to plain strings.
    #[arg(short = 'p', long = "param", action = clap::ArgAction::Append)]
    pub param: Vec<String>,

    /// JSON file with a parameter object, merged under explicit --param values
    #[arg(long = "params-file")]
    pub params_file: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let params = self.build_params(ctx)?;

        let report = ctx.registry.validate(&self.generator, &params)?;
        ctx.output.report(&report);
        if !report.is_valid {
            return Err(Error::validation_failed(&self.generator, &report.errors));
        }

        let resource = ctx.registry.run(&self.generator, &params)?;
        ctx.emit_resource(resource);
        Ok(0)
    }

    /// Assemble parameters: file values, then config defaults for holes,
    /// then explicit --param values on top.
    fn build_params(&self, ctx: &CommandContext) -> Result<GeneratorParams> {
        let mut params = GeneratorParams::new();

        if let Some(path) = &self.params_file {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read params file {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&contents)?;
            let obj = value.as_object().ok_or_else(|| {
                Error::InvalidParameter("params file must contain a JSON object".to_string())
            })?;
            for (k, v) in obj {
                params.insert(k.clone(), v.clone());
            }
        }

        let defaults = &ctx.config.defaults;
        if let Some(location) = &defaults.location {
            params
                .entry("location".to_string())
                .or_insert_with(|| serde_json::json!(location));
        }
        if let Some(subscription) = &defaults.subscription {
            params
                .entry("subscription".to_string())
                .or_insert_with(|| serde_json::json!(subscription));
        }
        if let Some(resource_group) = &defaults.resource_group {
            params
                .entry("resource_group".to_string())
                .or_insert_with(|| serde_json::json!(resource_group));
        }

        for pair in &self.param {
            let (key, value) = parse_param(pair)?;
            params.insert(key, value);
        }

        Ok(params)
    }
}

/// Parse a `key=value` pair. Values that parse as JSON keep their type
/// (numbers, booleans, arrays); everything else is a string.
pub fn parse_param(pair: &str) -> Result<(String, serde_json::Value)> {
    let (key, raw) = pair.split_once('=').ok_or_else(|| {
        Error::InvalidParameter(format!("'{}' is not of the form key=value", pair))
    })?;
    if key.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "'{}' has an empty parameter name",
            pair
        )));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!(raw));
    Ok((key.to_string(), value))
}

/// The `list` command: print the generator catalog.
pub fn list(ctx: &CommandContext) -> Result<i32> {
    if ctx.is_json_format() {
        let catalog: Vec<serde_json::Value> = ctx
            .registry
            .names()
            .iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|g| {
                serde_json::json!({
                    "name": g.name(),
                    "description": g.description(),
                    "required": g.required_params(),
                })
            })
            .collect();
        ctx.output.json(&serde_json::Value::Array(catalog));
        return Ok(0);
    }

    ctx.output.banner("GENERATOR CATALOG");
    for name in ctx.registry.names() {
        if let Some(generator) = ctx.registry.get(name) {
            ctx.output
                .info(&format!("{:<22} {}", name, generator.description()));
        }
    }
    Ok(0)
}
