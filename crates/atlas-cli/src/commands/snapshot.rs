//! One-shot snapshot command.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use atlas_core::{Config, ProcessSource, ShutdownSignal, SnapshotPublisher};
use tracing::info;

/// Run one read cycle and print (or write) the snapshot as pretty JSON
pub fn run(config: &Config, output: Option<&Path>) -> Result<()> {
    let publisher = SnapshotPublisher::new(
        ProcessSource::new(config.process.clone()),
        config.layout_registry()?,
        config.publisher_config(),
        Arc::new(ShutdownSignal::new()),
    );

    let Some(snapshot) = publisher.run_cycle()? else {
        bail!("Nothing to capture: the player is not in a loaded area");
    };

    if !snapshot.coverage.is_complete() {
        info!("Partial snapshot: {:?}", snapshot.coverage);
    }

    let json = serde_json::to_string_pretty(snapshot.as_ref())?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!("Snapshot #{} written to {:?}", snapshot.sequence, path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
