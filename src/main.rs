//! vmforge - Azure VM infrastructure template generator
//!
//! This is the main entry point for the vmforge CLI.

mod cli;

use clap::Parser;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vmforge::config::Config;

fn main() {
    let cli = Cli::parse_args();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_logging(cli.verbosity(), config.logging.level.as_deref());

    let ctx = CommandContext::new(&cli, config);

    let result = match &cli.command {
        Commands::Generate(args) => args.execute(&ctx),
        Commands::List => cli::commands::generate::list(&ctx),
        Commands::ConfigureBackup(args) => args.execute(&ctx),
        Commands::ValidateVhd(args) => args.execute(&ctx),
        Commands::Cleanup(args) => args.execute(&ctx),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ctx.output.error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}

/// Initialize logging from stacked `-v` flags, with the config file's
/// filter as the quiet-mode fallback.
fn init_logging(verbosity: u8, configured: Option<&str>) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 2))
        .with(env_filter)
        .init();
}
