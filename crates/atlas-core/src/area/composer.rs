use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::area::{AreaData, CollisionGrid, MAX_GRID_CELLS, PoiRules};
use crate::geometry::Rect;
use crate::memory::Address;
use crate::unit::UnitCollection;
use crate::world::{AreaId, WorldArena};

/// Everything the composed grid depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionKey {
    pub area: AreaId,
    pub bounds: Rect,
    /// Sorted addresses of the rooms that contributed cells
    pub rooms: Vec<Address>,
    /// Fingerprint of every contributing room's cells
    pub cells: u64,
}

/// Merges per-room collision maps into one area grid.
///
/// The last grid is kept with its [`CompositionKey`]; when the next cycle
/// produces the same key the `Arc` is handed out again instead of being
/// rebuilt.
#[derive(Debug, Default)]
pub struct AreaComposer {
    rules: PoiRules,
    cache: Option<(CompositionKey, Arc<CollisionGrid>)>,
    rebuilds: u64,
}

impl AreaComposer {
    pub fn new(rules: PoiRules) -> Self {
        Self {
            rules,
            cache: None,
            rebuilds: 0,
        }
    }

    pub fn rules(&self) -> &PoiRules {
        &self.rules
    }

    /// Number of grids built from scratch so far
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Compose area data from the rooms of `world`.
    ///
    /// Returns `None` when no room carries a collision map, e.g. while the
    /// player is between areas.
    pub fn compose(
        &mut self,
        area: AreaId,
        world: &WorldArena,
        units: &UnitCollection,
    ) -> Option<AreaData> {
        let mut contributing: Vec<_> = world
            .rooms()
            .iter()
            .filter_map(|room| room.collision.as_ref().map(|c| (room.address, c)))
            .collect();
        if contributing.is_empty() {
            debug!("Area {}: no rooms with collision data", area);
            return None;
        }
        contributing.sort_by_key(|(address, _)| *address);

        let bounds = contributing
            .iter()
            .map(|(_, collision)| collision.bounds())
            .reduce(|acc, rect| acc.union(&rect))?;
        let cell_count = bounds.width as usize * bounds.height as usize;
        if cell_count > MAX_GRID_CELLS {
            warn!(
                "Area {}: bounding box {}x{} at ({}, {}) is implausibly large",
                area, bounds.width, bounds.height, bounds.origin.x, bounds.origin.y
            );
            return None;
        }

        let mut hasher = DefaultHasher::new();
        for (address, collision) in &contributing {
            address.hash(&mut hasher);
            collision.hash(&mut hasher);
        }
        let key = CompositionKey {
            area,
            bounds,
            rooms: contributing.iter().map(|(address, _)| *address).collect(),
            cells: hasher.finish(),
        };

        let grid = match &self.cache {
            Some((cached, grid)) if *cached == key => Arc::clone(grid),
            _ => {
                // Same order as the key, so overlapping rooms resolve the same way
                let mut grid = CollisionGrid::new(bounds.width, bounds.height);
                for (_, collision) in &contributing {
                    grid.blit(collision, collision.origin.relative_to(bounds.origin));
                }
                let grid = Arc::new(grid);
                self.rebuilds += 1;
                debug!(
                    "Area {}: built {}x{} grid from {} rooms",
                    area,
                    bounds.width,
                    bounds.height,
                    contributing.len()
                );
                self.cache = Some((key, Arc::clone(&grid)));
                grid
            }
        };

        let points_of_interest = self
            .rules
            .collect(units.objects.iter().chain(&units.monsters), bounds.origin);

        Some(AreaData {
            area,
            origin: bounds.origin,
            grid,
            points_of_interest,
            room_count: world.len(),
        })
    }

    /// Forget the cached grid
    pub fn reset(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{CELL_BLOCKED, CELL_WALKABLE, PoiKind};
    use crate::geometry::Point;
    use crate::unit::{UnitKind, UnitPayload, UnitRecord};
    use crate::world::{RoomCollision, WorldArena};

    fn room(origin: Point, width: u32, height: u32, cell: u8) -> RoomCollision {
        RoomCollision {
            origin,
            width,
            height,
            cells: vec![cell; (width * height) as usize],
        }
    }

    fn world(rooms: Vec<Option<RoomCollision>>) -> WorldArena {
        let mut arena = WorldArena::new();
        let level = arena.insert_level(Address::new(0x9000), AreaId(1));
        for (i, collision) in rooms.into_iter().enumerate() {
            arena.insert_room(Address::new(0x1000 * (i as u64 + 1)), level, collision);
        }
        arena
    }

    #[test]
    fn test_two_adjacent_rooms() {
        let mut b = room(Point::new(4, 0), 4, 4, CELL_WALKABLE);
        b.cells[0] = CELL_BLOCKED;
        let world = world(vec![Some(room(Point::new(0, 0), 4, 4, CELL_WALKABLE)), Some(b)]);

        let mut composer = AreaComposer::default();
        let data = composer
            .compose(AreaId(1), &world, &UnitCollection::default())
            .unwrap();
        assert_eq!(data.origin, Point::new(0, 0));
        assert_eq!((data.grid.width, data.grid.height), (8, 4));
        // room B's first cell lands at column 4
        assert!(data.grid.is_walkable(Point::new(3, 0)));
        assert!(!data.grid.is_walkable(Point::new(4, 0)));
        assert!(data.grid.is_walkable(Point::new(5, 0)));
        assert_eq!(data.grid.walkable_count(), 31);
    }

    #[test]
    fn test_gap_between_rooms_is_blocked() {
        let world = world(vec![
            Some(room(Point::new(100, 100), 2, 2, CELL_WALKABLE)),
            Some(room(Point::new(104, 100), 2, 2, CELL_WALKABLE)),
        ]);
        let data = AreaComposer::default()
            .compose(AreaId(1), &world, &UnitCollection::default())
            .unwrap();
        assert_eq!(data.origin, Point::new(100, 100));
        assert_eq!(data.grid.width, 6);
        assert!(!data.grid.is_walkable(Point::new(2, 0)));
        assert!(data.grid.is_walkable(Point::new(4, 1)));
    }

    #[test]
    fn test_no_collision_data_yields_none() {
        let mut composer = AreaComposer::default();
        assert!(composer
            .compose(AreaId(1), &WorldArena::new(), &UnitCollection::default())
            .is_none());
        assert!(composer
            .compose(AreaId(1), &world(vec![None, None]), &UnitCollection::default())
            .is_none());
    }

    #[test]
    fn test_cache_reuses_identical_grid() {
        let world_a = world(vec![
            Some(room(Point::new(0, 0), 4, 4, CELL_WALKABLE)),
            Some(room(Point::new(4, 0), 4, 4, CELL_WALKABLE)),
        ]);
        let mut composer = AreaComposer::default();
        let first = composer
            .compose(AreaId(1), &world_a, &UnitCollection::default())
            .unwrap();
        let second = composer
            .compose(AreaId(1), &world_a, &UnitCollection::default())
            .unwrap();
        assert!(Arc::ptr_eq(&first.grid, &second.grid));
        assert_eq!(composer.rebuilds(), 1);

        // Same bounds, different cells: rebuilt, and matches a fresh build
        let world_b = world(vec![
            Some(room(Point::new(0, 0), 4, 4, CELL_WALKABLE)),
            Some(room(Point::new(4, 0), 4, 4, CELL_BLOCKED)),
        ]);
        let third = composer
            .compose(AreaId(1), &world_b, &UnitCollection::default())
            .unwrap();
        assert_eq!(composer.rebuilds(), 2);
        let fresh = AreaComposer::default()
            .compose(AreaId(1), &world_b, &UnitCollection::default())
            .unwrap();
        assert_eq!(*third.grid, *fresh.grid);

        // Different area id alone invalidates
        composer.compose(AreaId(2), &world_b, &UnitCollection::default());
        assert_eq!(composer.rebuilds(), 3);
    }

    #[test]
    fn test_points_of_interest_relative_to_origin() {
        let world = world(vec![Some(room(Point::new(5000, 4000), 10, 10, CELL_WALKABLE))]);
        let mut units = UnitCollection::default();
        units.push(UnitRecord {
            kind: UnitKind::Object,
            unit_id: 1,
            type_code: 119,
            mode: 0,
            position: Point::new(5004, 4006),
            address: Address::NULL,
            payload: UnitPayload::Object {
                interact_type: 1,
                selectable: true,
            },
        });

        let data = AreaComposer::default()
            .compose(AreaId(1), &world, &units)
            .unwrap();
        assert_eq!(data.points_of_interest.len(), 1);
        assert_eq!(data.points_of_interest[0].kind, PoiKind::Waypoint);
        assert_eq!(data.points_of_interest[0].grid_position, Point::new(4, 6));
    }
}
