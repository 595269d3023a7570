//! Raw world-graph records as laid out in game memory

use crate::decode::{Decode, Fields};
use crate::error::Result;
use crate::layout::names;
use crate::memory::Address;

/// Position record of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPath {
    pub dynamic_x: u16,
    pub dynamic_y: u16,
    pub static_x: u16,
    pub static_y: u16,
    pub room: Address,
}

impl Decode for RawPath {
    const LAYOUT: &'static str = names::PATH;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            dynamic_x: fields.u16("dynamic_x")?,
            dynamic_y: fields.u16("dynamic_y")?,
            static_x: fields.u16("static_x")?,
            static_y: fields.u16("static_y")?,
            room: fields.ptr("room")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRoom {
    /// Array of `near_count` room pointers
    pub near_rooms: Address,
    pub room_ex: Address,
    pub collision: Address,
    pub near_count: u32,
}

impl Decode for RawRoom {
    const LAYOUT: &'static str = names::ROOM;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            near_rooms: fields.ptr("near_rooms")?,
            room_ex: fields.ptr("room_ex")?,
            collision: fields.ptr("collision")?,
            near_count: fields.u32("near_count")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRoomEx {
    pub level: Address,
}

impl Decode for RawRoomEx {
    const LAYOUT: &'static str = names::ROOM_EX;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            level: fields.ptr("level")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLevel {
    pub area_id: u32,
}

impl Decode for RawLevel {
    const LAYOUT: &'static str = names::LEVEL;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            area_id: fields.u32("area_id")?,
        })
    }
}

/// Collision map header; `cells` points at `size_x * size_y` u16 words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCollision {
    pub pos_x: u32,
    pub pos_y: u32,
    pub size_x: u32,
    pub size_y: u32,
    pub cells: Address,
}

impl Decode for RawCollision {
    const LAYOUT: &'static str = names::COLLISION;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            pos_x: fields.u32("pos_x")?,
            pos_y: fields.u32("pos_y")?,
            size_x: fields.u32("size_x")?,
            size_y: fields.u32("size_y")?,
            cells: fields.ptr("cells")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::error::Error;
    use crate::layout::builtin_layouts;

    #[test]
    fn test_decode_path() {
        let layouts = builtin_layouts();
        let layout = layouts.get(names::PATH).unwrap();
        let mut bytes = vec![0u8; layout.size];
        bytes[0x02..0x04].copy_from_slice(&5120u16.to_le_bytes());
        bytes[0x06..0x08].copy_from_slice(&4410u16.to_le_bytes());
        bytes[0x10..0x12].copy_from_slice(&5121u16.to_le_bytes());
        bytes[0x14..0x16].copy_from_slice(&4411u16.to_le_bytes());
        bytes[0x20..0x28].copy_from_slice(&0x2_0000_1000u64.to_le_bytes());

        let path: RawPath = decode(&bytes, layout).unwrap();
        assert_eq!(
            path,
            RawPath {
                dynamic_x: 5120,
                dynamic_y: 4410,
                static_x: 5121,
                static_y: 4411,
                room: Address::new(0x2_0000_1000),
            }
        );

        assert!(matches!(
            decode::<RawPath>(&bytes[..0x20], layout),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_decode_level_area() {
        let layouts = builtin_layouts();
        let layout = layouts.get(names::LEVEL).unwrap();
        let mut bytes = vec![0u8; layout.size];
        bytes[0x1F8..0x1FC].copy_from_slice(&108u32.to_le_bytes());
        let level: RawLevel = decode(&bytes, layout).unwrap();
        assert_eq!(level.area_id, 108);
    }
}
