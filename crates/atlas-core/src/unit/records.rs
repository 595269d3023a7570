//! Raw unit records as laid out in game memory

use crate::decode::{Decode, Fields};
use crate::error::Result;
use crate::layout::names;
use crate::memory::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUnit {
    pub unit_type: u32,
    pub txt_file_no: u32,
    pub unit_id: u32,
    pub mode: u32,
    pub unit_data: Address,
    pub path: Address,
    pub stats: Address,
    pub inventory: Address,
    pub list_next: Address,
}

impl Decode for RawUnit {
    const LAYOUT: &'static str = names::UNIT;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            unit_type: fields.u32("unit_type")?,
            txt_file_no: fields.u32("txt_file_no")?,
            unit_id: fields.u32("unit_id")?,
            mode: fields.u32("mode")?,
            unit_data: fields.ptr("unit_data")?,
            path: fields.ptr("path")?,
            stats: fields.ptr("stats")?,
            inventory: fields.ptr("inventory")?,
            list_next: fields.ptr("list_next")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlayerData {
    pub name: String,
}

impl Decode for RawPlayerData {
    const LAYOUT: &'static str = names::PLAYER_DATA;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        let raw = fields.bytes("name")?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        Ok(Self {
            name: String::from_utf8_lossy(&raw[..end]).into_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMonsterData {
    pub type_flags: u8,
}

impl Decode for RawMonsterData {
    const LAYOUT: &'static str = names::MONSTER_DATA;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            type_flags: fields.u8("type_flags")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawObjectData {
    pub interact_type: u8,
}

impl Decode for RawObjectData {
    const LAYOUT: &'static str = names::OBJECT_DATA;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            interact_type: fields.u8("interact_type")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawItemData {
    pub quality: u32,
    pub flags: u32,
}

impl Decode for RawItemData {
    const LAYOUT: &'static str = names::ITEM_DATA;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            quality: fields.u32("quality")?,
            flags: fields.u32("flags")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInventory {
    /// Non-null only on the inventory of the locally controlled player
    pub owner_marker: Address,
}

impl Decode for RawInventory {
    const LAYOUT: &'static str = names::INVENTORY;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            owner_marker: fields.ptr("owner_marker")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStatList {
    pub stats: Address,
    pub count: u32,
}

impl Decode for RawStatList {
    const LAYOUT: &'static str = names::STAT_LIST;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            stats: fields.ptr("stats")?,
            count: fields.u32("count")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStat {
    pub layer: u16,
    pub stat_id: u16,
    pub value: i32,
}

impl Decode for RawStat {
    const LAYOUT: &'static str = names::STAT;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            layer: fields.u16("layer")?,
            stat_id: fields.u16("stat_id")?,
            value: fields.i32("value")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::layout::{FieldKind, StructLayout, builtin_layouts};

    #[test]
    fn test_decode_unit() {
        let layouts = builtin_layouts();
        let layout = layouts.get(names::UNIT).unwrap();
        let mut bytes = vec![0u8; layout.size];
        bytes[0x00..0x04].copy_from_slice(&1u32.to_le_bytes());
        bytes[0x04..0x08].copy_from_slice(&156u32.to_le_bytes());
        bytes[0x08..0x0C].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        bytes[0x38..0x40].copy_from_slice(&0x2_0000_0040u64.to_le_bytes());
        bytes[0x150..0x158].copy_from_slice(&0x2_0000_0800u64.to_le_bytes());

        let unit: RawUnit = decode(&bytes, layout).unwrap();
        assert_eq!(unit.unit_type, 1);
        assert_eq!(unit.txt_file_no, 156);
        assert_eq!(unit.unit_id, 0xDEAD_BEEF);
        assert_eq!(unit.path, Address::new(0x2_0000_0040));
        assert_eq!(unit.list_next, Address::new(0x2_0000_0800));
        assert!(unit.stats.is_null());
    }

    #[test]
    fn test_decode_object_data_with_minimal_layout() {
        let layout = StructLayout::new(names::OBJECT_DATA, 0x09).with_field(
            "interact_type",
            0x08,
            FieldKind::U8,
        );
        let mut bytes = vec![0u8; layout.size];
        bytes[0x08] = 3;
        let data: RawObjectData = decode(&bytes, &layout).unwrap();
        assert_eq!(data.interact_type, 3);
    }

    #[test]
    fn test_decode_player_name_stops_at_nul() {
        let layouts = builtin_layouts();
        let layout = layouts.get(names::PLAYER_DATA).unwrap();
        let mut bytes = vec![0u8; layout.size];
        bytes[..5].copy_from_slice(b"Akara");
        bytes[6] = b'x';
        let data: RawPlayerData = decode(&bytes, layout).unwrap();
        assert_eq!(data.name, "Akara");
    }

    #[test]
    fn test_decode_negative_stat() {
        let layouts = builtin_layouts();
        let layout = layouts.get(names::STAT).unwrap();
        let mut bytes = vec![0u8; layout.size];
        bytes[0x02..0x04].copy_from_slice(&39u16.to_le_bytes());
        bytes[0x04..0x08].copy_from_slice(&(-25i32).to_le_bytes());
        let stat: RawStat = decode(&bytes, layout).unwrap();
        assert_eq!(stat.stat_id, 39);
        assert_eq!(stat.value, -25);
    }
}
