//! `battwatch run`: the long-running monitoring engine.

use battwatch_config::{FileConfig, StatePlanStore};
use battwatch_core::{Engine, MemoryHost};
use tracing::{info, warn};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(config: FileConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config.into_settings()?;

    let host = Box::new(MemoryHost::new());
    let store = Box::new(match &global.config {
        // An explicit config file keeps its state file next to it.
        Some(path) => StatePlanStore::new(path.with_file_name("state.toml")),
        None => StatePlanStore::at_default_path(),
    });

    let (engine, handle) = Engine::new(settings, host, store)?;
    let task = tokio::spawn(engine.run());

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    handle.shutdown();
    if let Err(e) = task.await {
        warn!(error = %e, "engine task did not exit cleanly");
    }

    Ok(())
}
