//! Breadth-first traversal of the room graph.
//!
//! Rooms link to their neighbors through arrays of raw pointers, and links
//! are routinely mutual, so the graph is cyclic. The walk keeps a visited
//! set keyed by foreign address, decodes each room at most once and stops
//! after a fixed number of visits so a corrupted graph cannot run forever.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::decode::read_struct;
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::layout::{LayoutSet, names};
use crate::memory::layout::{collision, units};
use crate::memory::{Address, ReadMemory};
use crate::world::{AreaId, RawCollision, RawLevel, RawRoom, RawRoomEx, RoomCollision, WorldArena};

/// Bounds for one walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Maximum rooms visited (decoded or skipped) in one walk
    pub max_rooms: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self { max_rooms: 4096 }
    }
}

/// One room as read from memory, before it is placed in the arena
struct DecodedRoom {
    level: Address,
    area: AreaId,
    collision: Option<RoomCollision>,
    neighbors: Vec<Address>,
}

pub struct RoomWalker<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    layouts: &'a LayoutSet,
    limits: WalkLimits,
}

impl<'a, R: ReadMemory + ?Sized> RoomWalker<'a, R> {
    pub fn new(reader: &'a R, layouts: &'a LayoutSet, limits: WalkLimits) -> Self {
        Self {
            reader,
            layouts,
            limits,
        }
    }

    /// Walk every room reachable from `roots`.
    ///
    /// With `scope` set, rooms whose level is a different level are neither
    /// kept nor expanded. Rooms that fail with a recoverable read error are
    /// skipped; any other error aborts the walk.
    pub fn walk(&self, roots: &[Address], scope: Option<Address>) -> Result<WorldArena> {
        let mut arena = WorldArena::new();
        let mut visited: HashSet<Address> = HashSet::new();
        let mut queue: VecDeque<Address> = VecDeque::new();
        let mut links: Vec<(Address, Vec<Address>)> = Vec::new();

        for root in roots {
            if !root.is_null() && visited.insert(*root) {
                queue.push_back(*root);
            }
        }

        let mut visits = 0usize;
        while let Some(address) = queue.pop_front() {
            if visits >= self.limits.max_rooms {
                warn!(
                    "Room walk stopped after {} rooms ({} still queued)",
                    visits,
                    queue.len() + 1
                );
                arena.truncated = true;
                break;
            }
            visits += 1;

            let room = match self.read_room(address) {
                Ok(room) => room,
                Err(e) if e.is_recoverable() => {
                    debug!("Skipping room {}: {}", address, e);
                    arena.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if scope.is_some_and(|level| level != room.level) {
                arena.out_of_scope += 1;
                continue;
            }

            let level = arena.insert_level(room.level, room.area);
            arena.insert_room(address, level, room.collision);

            for neighbor in &room.neighbors {
                if visited.insert(*neighbor) {
                    queue.push_back(*neighbor);
                }
            }
            links.push((address, room.neighbors));
        }

        for (address, neighbors) in links {
            if let Some(id) = arena.room_id(address) {
                arena.link(id, &neighbors);
            }
        }

        debug!(
            "Room walk: {} rooms, {} levels, {} skipped, {} out of scope",
            arena.len(),
            arena.levels().len(),
            arena.skipped,
            arena.out_of_scope
        );
        Ok(arena)
    }

    /// Level address and area of the room at `address`
    pub fn locate(&self, address: Address) -> Result<(Address, AreaId)> {
        let room: RawRoom = read_struct(self.reader, self.layouts, address)?;
        self.level_of(address, &room)
    }

    fn level_of(&self, address: Address, room: &RawRoom) -> Result<(Address, AreaId)> {
        if room.room_ex.is_null() {
            return Err(Error::access_violation(
                address.get(),
                0,
                "room has no extended record",
            ));
        }
        let room_ex: RawRoomEx = read_struct(self.reader, self.layouts, room.room_ex)?;
        if room_ex.level.is_null() {
            return Err(Error::access_violation(
                room.room_ex.get(),
                0,
                "room has no level",
            ));
        }
        let level: RawLevel = read_struct(self.reader, self.layouts, room_ex.level)?;
        Ok((room_ex.level, AreaId(level.area_id)))
    }

    fn read_room(&self, address: Address) -> Result<DecodedRoom> {
        let room: RawRoom = read_struct(self.reader, self.layouts, address)?;
        let (level, area) = self.level_of(address, &room)?;
        let neighbors = self.read_neighbors(&room)?;

        let collision = if room.collision.is_null() {
            None
        } else {
            match self.read_collision(room.collision) {
                Ok(collision) => Some(collision),
                Err(e) if e.is_recoverable() => {
                    debug!("Room {} has unreadable collision map: {}", address, e);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        Ok(DecodedRoom {
            level,
            area,
            collision,
            neighbors,
        })
    }

    fn read_neighbors(&self, room: &RawRoom) -> Result<Vec<Address>> {
        if room.near_count == 0 {
            return Ok(Vec::new());
        }
        if room.near_count > collision::MAX_NEAR_ROOMS || room.near_rooms.is_null() {
            return Err(Error::access_violation(
                room.near_rooms.get(),
                0,
                format!("implausible neighbor list ({} entries)", room.near_count),
            ));
        }

        let bytes = self.reader.read_bytes(
            room.near_rooms.get(),
            room.near_count as usize * units::PTR_SIZE,
        )?;
        Ok(bytes
            .chunks_exact(units::PTR_SIZE)
            .filter_map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let addr = Address::new(u64::from_le_bytes(raw));
                (!addr.is_null()).then_some(addr)
            })
            .collect())
    }

    fn read_collision(&self, address: Address) -> Result<RoomCollision> {
        let raw: RawCollision = read_struct(self.reader, self.layouts, address)?;
        let span = 1..=collision::MAX_ROOM_SPAN;
        if !span.contains(&raw.size_x) || !span.contains(&raw.size_y) || raw.cells.is_null() {
            return Err(Error::access_violation(
                address.get(),
                self.layouts.get(names::COLLISION)?.size,
                format!("implausible collision map {}x{}", raw.size_x, raw.size_y),
            ));
        }
        let origin = match (i32::try_from(raw.pos_x), i32::try_from(raw.pos_y)) {
            (Ok(x), Ok(y)) => Point::new(x, y),
            _ => {
                return Err(Error::access_violation(
                    address.get(),
                    0,
                    format!("implausible room origin ({}, {})", raw.pos_x, raw.pos_y),
                ));
            }
        };

        let count = raw.size_x as usize * raw.size_y as usize;
        let bytes = self.reader.read_bytes(raw.cells.get(), count * 2)?;
        let cells = bytes
            .chunks_exact(2)
            .map(|word| {
                let word = u16::from_le_bytes([word[0], word[1]]);
                if word & collision::BLOCKED_MASK == 0 {
                    crate::area::CELL_WALKABLE
                } else {
                    crate::area::CELL_BLOCKED
                }
            })
            .collect();

        Ok(RoomCollision {
            origin,
            width: raw.size_x,
            height: raw.size_y,
            cells,
        })
    }
}
