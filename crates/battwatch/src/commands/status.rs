//! `battwatch status`: one-shot battery report.
//!
//! Fetches the device listing once and runs it through the same
//! identity/category pipeline the engine uses, without registering
//! anything on the server.

use battwatch_api::{ApiRequest, DeviceEntry, DomoClient, TransportConfig};
use battwatch_config::FileConfig;
use battwatch_core::{MemoryHost, MirrorRegistry, convert};
use chrono::Local;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: FileConfig,
    by_level: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let settings = config.into_settings()?;
    let transport = TransportConfig {
        timeout: settings.http_timeout,
    };
    let client = DomoClient::new(settings.server_url.clone(), &transport)?;

    let envelope = client.execute(&ApiRequest::devices()).await?;
    let entries: Vec<DeviceEntry> = envelope.decode_result();

    let now = Local::now().naive_local();
    let mut registry = MirrorRegistry::new(settings);
    for entry in &entries {
        if let Some(observation) = convert::observation_from_entry(entry, now) {
            registry.observe(observation);
        }
    }
    let mut host = MemoryHost::new();
    registry.reconcile(now, &mut host);

    let mut statuses = registry.status();
    if statuses.is_empty() {
        println!("No battery-reporting devices found.");
        return Ok(());
    }
    if by_level {
        statuses.sort_by(|a, b| a.level.total_cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
    }

    let table = output::battery_table(&statuses, output::should_color(&global.color));
    println!("{table}");
    Ok(())
}
