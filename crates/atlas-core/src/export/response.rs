//! Response body served to map clients.
//!
//! The collision grid is large and rarely changes, so it is only included
//! when the map changed since the previous response (area, width or height)
//! or the client asks for it.

use serde::Serialize;

use crate::area::PoiKind;
use crate::export::NameResolver;
use crate::geometry::Point;
use crate::snapshot::GameDataSnapshot;
use crate::unit::{Immunity, ItemMode, ItemQuality, MonsterType, UnitPayload, UnitRecord};
use crate::world::AreaId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonsterEntry {
    pub position: Point,
    pub immunities: Vec<Immunity>,
    pub unit_type: &'static str,
    #[serde(rename = "type")]
    pub monster_type: MonsterType,
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    pub position: Point,
    pub id: u32,
    pub selectable: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemEntry {
    pub position: Point,
    pub id: u32,
    pub name: String,
    pub quality: ItemQuality,
    pub mode: Option<ItemMode>,
    pub ethereal: bool,
    pub socketed: bool,
    pub identified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiEntry {
    pub position: Point,
    #[serde(rename = "type")]
    pub kind: PoiKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub monsters: Vec<MonsterEntry>,
    pub objects: Vec<ObjectEntry>,
    pub items: Vec<ItemEntry>,
    pub points_of_interest: Vec<PoiEntry>,
    pub player_pos: Option<Point>,
    pub area_origin: Option<Point>,
    /// `[row][column]`; `None` when unchanged since the last response
    pub collision_grid: Option<Vec<Vec<u8>>>,
    pub current_area: Option<String>,
}

impl ApiResponse {
    /// Body sent when there is no snapshot to report
    pub fn failure() -> Self {
        Self {
            success: false,
            monsters: Vec::new(),
            objects: Vec::new(),
            items: Vec::new(),
            points_of_interest: Vec::new(),
            player_pos: None,
            area_origin: None,
            collision_grid: None,
            current_area: None,
        }
    }
}

/// Builds responses for one client, remembering which map it last received
#[derive(Debug)]
pub struct ResponseBuilder<N: NameResolver> {
    names: N,
    last_map: Option<(AreaId, u32, u32)>,
}

impl<N: NameResolver> ResponseBuilder<N> {
    pub fn new(names: N) -> Self {
        Self {
            names,
            last_map: None,
        }
    }

    /// Build the response for `snapshot`.
    ///
    /// `force_map` sends the grid even if the client already has it. No
    /// snapshot produces a failure body and forgets the last map.
    pub fn build(&mut self, snapshot: Option<&GameDataSnapshot>, force_map: bool) -> ApiResponse {
        let Some(snapshot) = snapshot else {
            self.last_map = None;
            return ApiResponse::failure();
        };

        let area_data = &snapshot.area_data;
        let map = (snapshot.area, area_data.width(), area_data.height());
        let map_changed = self.last_map != Some(map);
        self.last_map = Some(map);

        ApiResponse {
            success: true,
            monsters: snapshot
                .units
                .monsters
                .iter()
                .filter_map(|unit| self.monster(unit))
                .collect(),
            objects: snapshot
                .units
                .objects
                .iter()
                .filter_map(|unit| self.object(unit))
                .collect(),
            items: snapshot
                .units
                .items
                .iter()
                .filter_map(|unit| self.item(unit))
                .collect(),
            points_of_interest: area_data
                .points_of_interest
                .iter()
                .map(|poi| PoiEntry {
                    position: poi.position,
                    kind: poi.kind,
                    label: poi.label.clone(),
                })
                .collect(),
            player_pos: Some(snapshot.player_position()),
            area_origin: Some(area_data.origin),
            collision_grid: (map_changed || force_map).then(|| area_data.grid.to_rows()),
            current_area: Some(self.names.area(snapshot.area)),
        }
    }

    fn monster(&self, unit: &UnitRecord) -> Option<MonsterEntry> {
        let UnitPayload::Monster {
            monster_type,
            immunities,
            ..
        } = &unit.payload
        else {
            return None;
        };
        Some(MonsterEntry {
            position: unit.position,
            immunities: immunities.clone(),
            unit_type: unit.kind.into(),
            monster_type: *monster_type,
            id: unit.unit_id,
            name: self.names.monster(unit.type_code),
        })
    }

    fn object(&self, unit: &UnitRecord) -> Option<ObjectEntry> {
        let UnitPayload::Object { selectable, .. } = &unit.payload else {
            return None;
        };
        Some(ObjectEntry {
            position: unit.position,
            id: unit.unit_id,
            selectable: *selectable,
            name: self.names.object(unit.type_code),
        })
    }

    fn item(&self, unit: &UnitRecord) -> Option<ItemEntry> {
        let UnitPayload::Item {
            quality,
            flags,
            mode,
            ..
        } = &unit.payload
        else {
            return None;
        };
        Some(ItemEntry {
            position: unit.position,
            id: unit.unit_id,
            name: self.names.item(unit.type_code),
            quality: *quality,
            mode: *mode,
            ethereal: flags.is_ethereal(),
            socketed: flags.is_socketed(),
            identified: flags.is_identified(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{AreaData, CELL_WALKABLE, CollisionGrid, PointOfInterest};
    use crate::export::CodeNames;
    use crate::memory::Address;
    use crate::snapshot::Coverage;
    use crate::unit::{MonsterFlags, UnitCollection, UnitKind};
    use chrono::Utc;
    use std::sync::Arc;

    fn snapshot(area: u32, width: u32, height: u32) -> GameDataSnapshot {
        let mut grid = CollisionGrid::new(width, height);
        grid.cells[0] = CELL_WALKABLE;

        let mut units = UnitCollection::default();
        let flags = MonsterFlags(MonsterFlags::CHAMPION);
        units.push(UnitRecord {
            kind: UnitKind::Monster,
            unit_id: 7,
            type_code: 42,
            mode: 1,
            position: Point::new(110, 120),
            address: Address::NULL,
            payload: UnitPayload::Monster {
                flags,
                monster_type: flags.monster_type(),
                immunities: vec![Immunity::Cold],
            },
        });

        let player = UnitRecord {
            kind: UnitKind::Player,
            unit_id: 1,
            type_code: 0,
            mode: 1,
            position: Point::new(105, 106),
            address: Address::NULL,
            payload: UnitPayload::Player {
                name: "Local".to_string(),
                controlled: true,
            },
        };

        GameDataSnapshot {
            sequence: 1,
            captured_at: Utc::now(),
            area: AreaId(area),
            player,
            units,
            area_data: AreaData {
                area: AreaId(area),
                origin: Point::new(100, 100),
                grid: Arc::new(grid),
                points_of_interest: vec![PointOfInterest {
                    position: Point::new(102, 103),
                    grid_position: Point::new(2, 3),
                    kind: PoiKind::Waypoint,
                    label: "waypoint".to_string(),
                    type_code: 119,
                }],
                room_count: 1,
            },
            coverage: Coverage::default(),
        }
    }

    #[test]
    fn test_grid_sent_only_on_map_change() {
        let mut builder = ResponseBuilder::new(CodeNames);
        let first = snapshot(1, 3, 2);

        let response = builder.build(Some(&first), false);
        assert!(response.success);
        assert_eq!(
            response.collision_grid,
            Some(vec![vec![1, 0, 0], vec![0, 0, 0]])
        );

        assert!(builder.build(Some(&first), false).collision_grid.is_none());
        assert!(builder.build(Some(&first), true).collision_grid.is_some());

        // Same area, new size
        assert!(builder.build(Some(&snapshot(1, 4, 2)), false).collision_grid.is_some());
        // New area, same size
        assert!(builder.build(Some(&snapshot(2, 4, 2)), false).collision_grid.is_some());
    }

    #[test]
    fn test_missing_snapshot_resets_tracking() {
        let mut builder = ResponseBuilder::new(CodeNames);
        let snap = snapshot(1, 3, 2);
        builder.build(Some(&snap), false);

        let failure = builder.build(None, false);
        assert!(!failure.success);
        assert!(builder.build(Some(&snap), false).collision_grid.is_some());
    }

    #[test]
    fn test_body_shape() {
        let mut builder = ResponseBuilder::new(CodeNames);
        let response = builder.build(Some(&snapshot(39, 3, 2)), false);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["current_area"], "39");
        assert_eq!(json["player_pos"]["x"], 105);
        assert_eq!(json["area_origin"]["y"], 100);
        assert_eq!(json["monsters"][0]["type"], "Champion");
        assert_eq!(json["monsters"][0]["unit_type"], "Monster");
        assert_eq!(json["monsters"][0]["immunities"][0], "Cold");
        assert_eq!(json["monsters"][0]["name"], "42");
        assert_eq!(json["points_of_interest"][0]["type"], "waypoint");
    }
}
