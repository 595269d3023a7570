use std::collections::HashMap;

use crate::geometry::{Point, Rect};
use crate::memory::Address;
use crate::world::AreaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(pub u32);

/// Walkability cells of one room, relative to the room's own origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCollision {
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` cells
    pub cells: Vec<u8>,
}

impl RoomCollision {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.origin, self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub address: Address,
    pub level: LevelId,
    /// Absent when the room's collision map could not be read
    pub collision: Option<RoomCollision>,
    pub neighbors: Vec<RoomId>,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub address: Address,
    pub area: AreaId,
    pub rooms: Vec<RoomId>,
}

/// Rooms and levels decoded during one walk
#[derive(Debug, Clone, Default)]
pub struct WorldArena {
    rooms: Vec<Room>,
    levels: Vec<Level>,
    room_index: HashMap<Address, RoomId>,
    level_index: HashMap<Address, LevelId>,
    /// Rooms that failed to decode and were left out
    pub skipped: usize,
    /// Rooms reached but outside the walk scope
    pub out_of_scope: usize,
    /// The visit bound stopped the walk early
    pub truncated: bool,
}

impl WorldArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0 as usize)
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(id.0 as usize)
    }

    pub fn room_id(&self, address: Address) -> Option<RoomId> {
        self.room_index.get(&address).copied()
    }

    pub fn level_id(&self, address: Address) -> Option<LevelId> {
        self.level_index.get(&address).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Register a level, returning the existing id if already known
    pub fn insert_level(&mut self, address: Address, area: AreaId) -> LevelId {
        if let Some(id) = self.level_index.get(&address) {
            return *id;
        }
        let id = LevelId(self.levels.len() as u32);
        self.levels.push(Level {
            address,
            area,
            rooms: Vec::new(),
        });
        self.level_index.insert(address, id);
        id
    }

    pub fn insert_room(
        &mut self,
        address: Address,
        level: LevelId,
        collision: Option<RoomCollision>,
    ) -> RoomId {
        if let Some(id) = self.room_index.get(&address) {
            return *id;
        }
        let id = RoomId(self.rooms.len() as u32);
        self.rooms.push(Room {
            address,
            level,
            collision,
            neighbors: Vec::new(),
        });
        self.room_index.insert(address, id);
        if let Some(level) = self.levels.get_mut(level.0 as usize) {
            level.rooms.push(id);
        }
        id
    }

    /// Resolve neighbor addresses of `room` into ids; unknown addresses are dropped
    pub fn link(&mut self, room: RoomId, neighbors: &[Address]) {
        let mut ids: Vec<RoomId> = neighbors
            .iter()
            .filter_map(|addr| self.room_index.get(addr).copied())
            .filter(|id| *id != room)
            .collect();
        ids.sort();
        ids.dedup();
        if let Some(room) = self.rooms.get_mut(room.0 as usize) {
            room.neighbors = ids;
        }
    }

    /// Collision maps of every room, in insertion order
    pub fn collisions(&self) -> impl Iterator<Item = &RoomCollision> {
        self.rooms.iter().filter_map(|room| room.collision.as_ref())
    }
}
