//! Compiled-in layout set for the current retail build.

use super::FieldKind::{Bytes, I32, Ptr, U8, U16, U32};
use super::{Globals, LayoutSet, StructLayout, names};

pub const BUILTIN_VERSION: &str = "d2r-retail";

/// Main module image size of the build the built-in set was taken from
pub const BUILTIN_IMAGE_SIZE: u32 = 0x0283_7000;

/// Unit hash table, relative to the module base
const UNIT_TABLE_OFFSET: u64 = 0x020A_F660;

pub fn builtin_layouts() -> LayoutSet {
    let mut set = LayoutSet {
        version: BUILTIN_VERSION.to_string(),
        image_size: Some(BUILTIN_IMAGE_SIZE),
        globals: Globals {
            unit_table: UNIT_TABLE_OFFSET,
        },
        structs: Default::default(),
    };

    set.insert(
        StructLayout::new(names::UNIT, 0x158)
            .with_field("unit_type", 0x00, U32)
            .with_field("txt_file_no", 0x04, U32)
            .with_field("unit_id", 0x08, U32)
            .with_field("mode", 0x0C, U32)
            .with_field("unit_data", 0x10, Ptr)
            .with_field("path", 0x38, Ptr)
            .with_field("stats", 0x88, Ptr)
            .with_field("inventory", 0x90, Ptr)
            .with_field("list_next", 0x150, Ptr),
    );

    set.insert(
        StructLayout::new(names::PATH, 0x28)
            .with_field("dynamic_x", 0x02, U16)
            .with_field("dynamic_y", 0x06, U16)
            .with_field("static_x", 0x10, U16)
            .with_field("static_y", 0x14, U16)
            .with_field("room", 0x20, Ptr),
    );

    set.insert(
        StructLayout::new(names::ROOM, 0xB8)
            .with_field("near_rooms", 0x00, Ptr)
            .with_field("room_ex", 0x18, Ptr)
            .with_field("collision", 0x20, Ptr)
            .with_field("near_count", 0x40, U32),
    );

    set.insert(StructLayout::new(names::ROOM_EX, 0x98).with_field("level", 0x90, Ptr));

    set.insert(StructLayout::new(names::LEVEL, 0x200).with_field("area_id", 0x1F8, U32));

    set.insert(
        StructLayout::new(names::COLLISION, 0x30)
            .with_field("pos_x", 0x00, U32)
            .with_field("pos_y", 0x04, U32)
            .with_field("size_x", 0x08, U32)
            .with_field("size_y", 0x0C, U32)
            .with_field("cells", 0x20, Ptr),
    );

    set.insert(StructLayout::new(names::PLAYER_DATA, 0x10).with_field("name", 0x00, Bytes(16)));

    set.insert(
        StructLayout::new(names::MONSTER_DATA, 0x20).with_field("type_flags", 0x1A, U8),
    );

    set.insert(
        StructLayout::new(names::OBJECT_DATA, 0x10)
            .with_field("interact_type", 0x08, U8),
    );

    set.insert(
        StructLayout::new(names::ITEM_DATA, 0x20)
            .with_field("quality", 0x00, U32)
            .with_field("flags", 0x18, U32),
    );

    set.insert(StructLayout::new(names::INVENTORY, 0x78).with_field("owner_marker", 0x70, Ptr));

    set.insert(
        StructLayout::new(names::STAT_LIST, 0x40)
            .with_field("stats", 0x30, Ptr)
            .with_field("count", 0x38, U32),
    );

    set.insert(
        StructLayout::new(names::STAT, 0x08)
            .with_field("layer", 0x00, U16)
            .with_field("stat_id", 0x02, U16)
            .with_field("value", 0x04, I32),
    );

    set
}
