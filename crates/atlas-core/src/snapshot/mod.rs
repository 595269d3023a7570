//! Published read-cycle results.

mod publisher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::area::AreaData;
use crate::geometry::Point;
use crate::unit::{UnitCollection, UnitRecord};
use crate::world::AreaId;

pub use publisher::{PublisherConfig, PublisherConfigBuilder, SnapshotPublisher};

/// How much of the world one cycle failed to cover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub rooms: usize,
    pub rooms_skipped: usize,
    pub rooms_out_of_scope: usize,
    pub walk_truncated: bool,
    pub units_dropped: usize,
    /// Unit lists whose tail could not be followed
    pub unit_lists_broken: usize,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.rooms_skipped == 0
            && !self.walk_truncated
            && self.units_dropped == 0
            && self.unit_lists_broken == 0
    }
}

/// One fully composed read cycle. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDataSnapshot {
    /// Increases by one per published snapshot
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub area: AreaId,
    /// The locally controlled player
    pub player: UnitRecord,
    pub units: UnitCollection,
    pub area_data: AreaData,
    pub coverage: Coverage,
}

impl GameDataSnapshot {
    pub fn player_position(&self) -> Point {
        self.player.position
    }

    /// Player position in grid coordinates
    pub fn player_grid_position(&self) -> Point {
        self.area_data.to_grid(self.player.position)
    }
}
