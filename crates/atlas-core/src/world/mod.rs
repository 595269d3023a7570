//! World geography: rooms, levels and the graph linking them.
//!
//! Decoded rooms and levels live in a per-cycle [`WorldArena`] and refer to
//! each other through [`RoomId`] / [`LevelId`] indices. Foreign addresses
//! are kept only as identity for traversal.

mod arena;
mod records;
mod walker;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use arena::{Level, LevelId, Room, RoomCollision, RoomId, WorldArena};
pub use records::{RawCollision, RawLevel, RawPath, RawRoom, RawRoomEx};
pub use walker::{RoomWalker, WalkLimits};

/// Map / area identifier of a level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AreaId(pub u32);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
