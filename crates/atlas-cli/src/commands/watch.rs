//! Watch mode: poll the game until shutdown.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use atlas_core::unit::UnitPayload;
use atlas_core::{
    CodeNames, Config, Error, GameDataSnapshot, LootFilters, NameResolver, ProcessSource,
    ResponseBuilder, ShutdownSignal, SnapshotPublisher,
};
use chrono::Local;
use tracing::{debug, info, warn};

/// Logs ground items the first time they are seen, if a filter accepts them.
///
/// Filter keys are looked up by resolved name, then by type code; with
/// [`CodeNames`] only type-code keys can match.
struct LootLog {
    filters: LootFilters,
    seen: HashSet<u32>,
}

impl LootLog {
    fn load(config: &Config) -> Option<Self> {
        let path = config.loot_filter.as_ref()?;
        match LootFilters::load(path) {
            Ok(filters) => {
                info!("Loaded loot filter from {:?}", path);
                Some(Self {
                    filters,
                    seen: HashSet::new(),
                })
            }
            Err(e) => {
                warn!("Failed to load loot filter {:?}: {}, loot log disabled", path, e);
                None
            }
        }
    }

    fn observe<N: NameResolver>(&mut self, snapshot: &GameDataSnapshot, names: &N) {
        let mut current = HashSet::new();
        for item in &snapshot.units.items {
            let UnitPayload::Item { mode, quality, .. } = &item.payload else {
                continue;
            };
            if !mode.is_some_and(|mode| mode.is_dropped()) {
                continue;
            }
            current.insert(item.unit_id);
            if self.seen.contains(&item.unit_id) {
                continue;
            }

            if self.filters.matches_item(names, item) {
                let name = names.item(item.type_code);
                info!(
                    "[{}] Loot: {} {} at ({}, {})",
                    snapshot.captured_at.with_timezone(&Local).format("%H:%M:%S"),
                    quality,
                    name,
                    item.position.x,
                    item.position.y
                );
            }
        }
        // Only remember what is still on the ground
        self.seen = current;
    }

    fn reset(&mut self) {
        self.seen.clear();
    }
}

pub fn run(
    config: &Config,
    shutdown: Arc<ShutdownSignal>,
    json: bool,
    force_map: bool,
) -> Result<()> {
    let publisher = SnapshotPublisher::new(
        ProcessSource::new(config.process.clone()),
        config.layout_registry()?,
        config.publisher_config(),
        Arc::clone(&shutdown),
    );
    let mut responses = ResponseBuilder::new(CodeNames);
    let mut loot = LootLog::load(config);
    let mut attached = false;

    if !json {
        println!("Waiting for {}... (Ctrl+C to quit)", config.process);
    }

    while !shutdown.is_shutdown() {
        let delay = match publisher.run_cycle() {
            Ok(Some(snapshot)) => {
                attached = true;
                if json {
                    let response = responses.build(Some(&snapshot), force_map);
                    println!("{}", serde_json::to_string(&response)?);
                } else {
                    print_status(&snapshot)?;
                }
                if let Some(loot) = loot.as_mut() {
                    loot.observe(&snapshot, &CodeNames);
                }
                config.poll_interval()
            }
            Ok(None) => {
                if json {
                    println!("{}", serde_json::to_string(&responses.build(None, false))?);
                }
                config.poll_interval()
            }
            Err(Error::ProcessUnavailable(reason)) => {
                if attached {
                    info!("Game process lost ({}), waiting for reconnect...", reason);
                    attached = false;
                    responses.build(None, false);
                    if let Some(loot) = loot.as_mut() {
                        loot.reset();
                    }
                } else {
                    debug!("Game process not available: {}", reason);
                }
                config.reconnect_delay()
            }
            // Already logged by the publisher
            Err(_) => config.poll_interval(),
        };

        if shutdown.wait(delay) {
            break;
        }
    }

    if !json {
        println!();
    }
    info!("Shutting down");
    Ok(())
}

fn print_status(snapshot: &GameDataSnapshot) -> Result<()> {
    let position = snapshot.player_position();
    let mut stdout = io::stdout().lock();
    write!(
        stdout,
        "\r#{:<6} area {:>3}  pos ({:>5}, {:>5})  grid {}x{}  mon {:>3}  items {:>3}  poi {:>2}  ",
        snapshot.sequence,
        snapshot.area.0,
        position.x,
        position.y,
        snapshot.area_data.width(),
        snapshot.area_data.height(),
        snapshot.units.monsters.len(),
        snapshot.units.items.len(),
        snapshot.area_data.points_of_interest.len()
    )?;
    stdout.flush()?;
    Ok(())
}
