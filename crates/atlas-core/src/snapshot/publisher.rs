//! Read-cycle orchestration.
//!
//! A cycle acquires a context, resolves the layout set, reads the units,
//! walks the player's level and composes the area. Only a fully built
//! snapshot is published, by swapping one `Arc` under a short lock, so
//! readers always get either the new snapshot or the previous one.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::area::{AreaComposer, PoiRule, PoiRules};
use crate::error::Result;
use crate::layout::LayoutRegistry;
use crate::memory::ContextSource;
use crate::shutdown::ShutdownSignal;
use crate::snapshot::{Coverage, GameDataSnapshot};
use crate::unit::{EntityReader, UnitLimits};
use crate::world::{AreaId, RoomWalker, WalkLimits};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublisherConfig {
    pub walk_limits: WalkLimits,
    pub unit_limits: UnitLimits,
    /// Layout set to use regardless of the process fingerprint
    pub layout_version: Option<String>,
    /// Follow room links into other levels
    pub cross_levels: bool,
    /// Point-of-interest rules added after the built-in ones
    pub poi_rules: Vec<PoiRule>,
}

impl PublisherConfig {
    pub fn builder() -> PublisherConfigBuilder {
        PublisherConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublisherConfigBuilder {
    walk_limits: Option<WalkLimits>,
    unit_limits: Option<UnitLimits>,
    layout_version: Option<String>,
    cross_levels: Option<bool>,
    poi_rules: Vec<PoiRule>,
}

impl PublisherConfigBuilder {
    pub fn walk_limits(mut self, limits: WalkLimits) -> Self {
        self.walk_limits = Some(limits);
        self
    }

    pub fn unit_limits(mut self, limits: UnitLimits) -> Self {
        self.unit_limits = Some(limits);
        self
    }

    pub fn layout_version<S: Into<String>>(mut self, version: S) -> Self {
        self.layout_version = Some(version.into());
        self
    }

    pub fn cross_levels(mut self, enabled: bool) -> Self {
        self.cross_levels = Some(enabled);
        self
    }

    pub fn poi_rules(mut self, rules: Vec<PoiRule>) -> Self {
        self.poi_rules = rules;
        self
    }

    pub fn build(self) -> PublisherConfig {
        let default = PublisherConfig::default();
        PublisherConfig {
            walk_limits: self.walk_limits.unwrap_or(default.walk_limits),
            unit_limits: self.unit_limits.unwrap_or(default.unit_limits),
            layout_version: self.layout_version,
            cross_levels: self.cross_levels.unwrap_or(default.cross_levels),
            poi_rules: self.poi_rules,
        }
    }
}

/// State carried from one cycle to the next; only touched by the cycle
/// holding the lock
struct CycleState {
    composer: AreaComposer,
    sequence: u64,
    last_area: Option<AreaId>,
}

pub struct SnapshotPublisher<S: ContextSource> {
    source: S,
    layouts: LayoutRegistry,
    config: PublisherConfig,
    shutdown: Arc<ShutdownSignal>,
    cycle: Mutex<CycleState>,
    current: Mutex<Option<Arc<GameDataSnapshot>>>,
}

impl<S: ContextSource> SnapshotPublisher<S> {
    pub fn new(
        source: S,
        layouts: LayoutRegistry,
        config: PublisherConfig,
        shutdown: Arc<ShutdownSignal>,
    ) -> Self {
        let composer = AreaComposer::new(PoiRules::with_extra(&config.poi_rules));
        Self {
            source,
            layouts,
            config,
            shutdown,
            cycle: Mutex::new(CycleState {
                composer,
                sequence: 0,
                last_area: None,
            }),
            current: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn shutdown(&self) -> &Arc<ShutdownSignal> {
        &self.shutdown
    }

    /// The last published snapshot
    pub fn current(&self) -> Option<Arc<GameDataSnapshot>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the current snapshot, running a cycle first if asked to.
    ///
    /// A failed forced cycle is logged and the previous snapshot returned.
    pub fn get_snapshot(&self, force_refresh: bool) -> Option<Arc<GameDataSnapshot>> {
        if force_refresh && !self.shutdown.is_shutdown() {
            if let Err(e) = self.run_cycle() {
                debug!("Forced refresh failed: {}", e);
            }
        }
        self.current()
    }

    /// Run one read cycle.
    ///
    /// Returns the newly published snapshot, `Ok(None)` if nothing was
    /// published (shutdown, or the player is between areas), or the error
    /// that aborted the cycle. The previous snapshot stays published in
    /// every case but the first.
    pub fn run_cycle(&self) -> Result<Option<Arc<GameDataSnapshot>>> {
        if self.shutdown.is_shutdown() {
            return Ok(None);
        }

        let mut state = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.is_shutdown() {
            return Ok(None);
        }

        match self.build(&mut state) {
            Ok(Some(snapshot)) => {
                let snapshot = Arc::new(snapshot);
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&snapshot));
                debug!(
                    "Published snapshot #{} (area {}, {} units)",
                    snapshot.sequence,
                    snapshot.area,
                    snapshot.units.len()
                );
                Ok(Some(snapshot))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("Read cycle failed, keeping previous snapshot: {}", e);
                Err(e)
            }
        }
    }

    fn build(&self, state: &mut CycleState) -> Result<Option<GameDataSnapshot>> {
        // Released when this function returns, on every path
        let context = self.source.acquire()?;
        let layouts = self
            .layouts
            .resolve(context.info(), self.config.layout_version.as_deref())?;

        let entities = EntityReader::new(&context, layouts, self.config.unit_limits).read()?;
        let player = entities.require_player()?.clone();
        let Some(location) = entities.location else {
            debug!("Player is between areas");
            return Ok(None);
        };

        let scope = (!self.config.cross_levels).then_some(location.level);
        let world = RoomWalker::new(&context, layouts, self.config.walk_limits)
            .walk(&[location.room], scope)?;

        let Some(area_data) = state
            .composer
            .compose(location.area, &world, &entities.units)
        else {
            debug!("No collision data reachable in area {}", location.area);
            return Ok(None);
        };

        if state.last_area != Some(location.area) {
            info!(
                "Entered area {} ({}x{} grid, {} rooms)",
                location.area,
                area_data.width(),
                area_data.height(),
                area_data.room_count
            );
            state.last_area = Some(location.area);
        }

        state.sequence += 1;
        Ok(Some(GameDataSnapshot {
            sequence: state.sequence,
            captured_at: Utc::now(),
            area: location.area,
            player,
            units: entities.units,
            area_data,
            coverage: Coverage {
                rooms: world.len(),
                rooms_skipped: world.skipped,
                rooms_out_of_scope: world.out_of_scope,
                walk_truncated: world.truncated,
                units_dropped: entities.dropped,
                unit_lists_broken: entities.broken_lists,
            },
        }))
    }
}
