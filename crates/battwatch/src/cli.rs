//! Clap derive structures for the `battwatch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-level CLI ────────────────────────────────────────────────────

/// battwatch -- battery watchdog for home automation servers
#[derive(Debug, Parser)]
#[command(
    name = "battwatch",
    version,
    about = "Watch battery levels reported by a Domoticz-style server",
    long_about = "Polls a home automation server for battery-reporting hardware,\n\
        smooths the noisy readings, mirrors each battery as a percentage\n\
        device of its own and keeps the mirrors grouped in a sorted plan.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to load instead of the platform default
    #[arg(long, short = 'c', env = "BATTWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides the config file)
    #[arg(long, short = 's', global = true)]
    pub server: Option<String>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-level command enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitoring engine in the foreground
    Run,

    /// One-shot battery report from the server
    #[command(alias = "st")]
    Status {
        /// Order rows by battery level instead of slot
        #[arg(long)]
        by_level: bool,
    },

    /// Print the merged configuration after validation
    CheckConfig,
}
