//! `battwatch check-config`: show the merged configuration.

use battwatch_config::FileConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub fn handle(config: FileConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(battwatch_config::config_path);
    // Same placement rule as `run`: an explicit config file keeps its
    // state file next to it.
    let state_path = match &global.config {
        Some(path) => path.with_file_name("state.toml"),
        None => battwatch_config::state_path(),
    };

    // Serialize before validation consumes the config.
    let rendered = toml::to_string_pretty(&config).expect("config serializes");

    // Surface the same failures `run` would hit, before printing anything.
    config.into_settings()?;

    println!("# config: {}", config_path.display());
    println!("# state:  {}", state_path.display());
    print!("{rendered}");
    Ok(())
}
