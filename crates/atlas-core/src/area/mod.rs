//! Derived map data: one walkability grid per area plus points of interest.

mod composer;
mod grid;
mod poi;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::world::AreaId;

pub use composer::{AreaComposer, CompositionKey};
pub use grid::{CELL_BLOCKED, CELL_WALKABLE, CollisionGrid, MAX_GRID_CELLS};
pub use poi::{PoiKind, PoiMatch, PoiRule, PoiRules, PointOfInterest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaData {
    pub area: AreaId,
    /// World coordinates of grid cell (0, 0)
    pub origin: Point,
    pub grid: Arc<CollisionGrid>,
    pub points_of_interest: Vec<PointOfInterest>,
    /// Rooms reached by the walk, with or without collision data
    pub room_count: usize,
}

impl AreaData {
    pub fn width(&self) -> u32 {
        self.grid.width
    }

    pub fn height(&self) -> u32 {
        self.grid.height
    }

    /// Grid coordinates of a world position
    pub fn to_grid(&self, world: Point) -> Point {
        world.relative_to(self.origin)
    }
}
