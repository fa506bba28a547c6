mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli.global)?;

    // Config file verbosity raises the floor; -v flags stack on top.
    init_tracing(cli.global.verbose.max(config.log.verbosity));

    match cli.command {
        Command::Run => commands::run::handle(config, &cli.global).await,
        Command::Status { by_level } => {
            commands::status::handle(config, by_level, &cli.global).await
        }
        Command::CheckConfig => commands::check_config::handle(config, &cli.global),
    }
}

/// Load the config file and fold CLI overrides into it.
fn load_config(global: &GlobalOpts) -> Result<battwatch_config::FileConfig, CliError> {
    let mut config = battwatch_config::load(global.config.as_deref())?;
    if let Some(url) = &global.server {
        config.server.url.clone_from(url);
    }
    if let Some(secs) = global.timeout {
        config.server.timeout_secs = secs;
    }
    Ok(config)
}
