//! Synthetic game memory for tests.
//!
//! `WorldFixture` lays out rooms, levels and units in a [`MockMemoryReader`]
//! using the offsets of the built-in layout set, so the same decoding paths
//! run against it as against a live process.

use crate::geometry::Point;
use crate::layout::{BUILTIN_IMAGE_SIZE, LayoutSet, builtin_layouts};
use crate::memory::layout::units;
use crate::memory::{Address, MockMemoryBuilder, MockMemoryReader, MockSource};

/// Start of the fake heap
const HEAP_BASE: u64 = 0x2_0000_0000;

/// Never mapped; used to break pointers
pub const UNMAPPED: u64 = 0x6_0000_0000;

// Offsets below mirror `builtin_layouts()`
mod off {
    pub const UNIT_SIZE: usize = 0x158;
    pub const UNIT_TYPE: u64 = 0x00;
    pub const UNIT_TXT: u64 = 0x04;
    pub const UNIT_ID: u64 = 0x08;
    pub const UNIT_MODE: u64 = 0x0C;
    pub const UNIT_DATA: u64 = 0x10;
    pub const UNIT_PATH: u64 = 0x38;
    pub const UNIT_STATS: u64 = 0x88;
    pub const UNIT_INVENTORY: u64 = 0x90;
    pub const UNIT_NEXT: u64 = 0x150;

    pub const PATH_SIZE: usize = 0x28;
    pub const PATH_DYN_X: u64 = 0x02;
    pub const PATH_DYN_Y: u64 = 0x06;
    pub const PATH_STATIC_X: u64 = 0x10;
    pub const PATH_STATIC_Y: u64 = 0x14;
    pub const PATH_ROOM: u64 = 0x20;

    pub const ROOM_SIZE: usize = 0xB8;
    pub const ROOM_NEAR: u64 = 0x00;
    pub const ROOM_EX: u64 = 0x18;
    pub const ROOM_COLLISION: u64 = 0x20;
    pub const ROOM_NEAR_COUNT: u64 = 0x40;

    pub const ROOM_EX_SIZE: usize = 0x98;
    pub const ROOM_EX_LEVEL: u64 = 0x90;

    pub const LEVEL_SIZE: usize = 0x200;
    pub const LEVEL_AREA: u64 = 0x1F8;

    pub const COLLISION_SIZE: usize = 0x30;
    pub const COLLISION_CELLS: u64 = 0x20;

    pub const MONSTER_DATA_SIZE: usize = 0x20;
    pub const MONSTER_FLAGS: u64 = 0x1A;

    pub const OBJECT_DATA_SIZE: usize = 0x10;
    pub const OBJECT_INTERACT: u64 = 0x08;

    pub const ITEM_DATA_SIZE: usize = 0x20;
    pub const ITEM_QUALITY: u64 = 0x00;
    pub const ITEM_FLAGS: u64 = 0x18;

    pub const INVENTORY_SIZE: usize = 0x78;
    pub const INVENTORY_OWNER: u64 = 0x70;

    pub const STAT_LIST_SIZE: usize = 0x40;
    pub const STAT_LIST_STATS: u64 = 0x30;
    pub const STAT_LIST_COUNT: u64 = 0x38;
}

/// A room to place in the fixture
#[derive(Debug, Clone)]
pub struct RoomSpec {
    pub level: Address,
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    /// Room-local `(x, y)` cells that are blocked
    pub blocked: Vec<(u32, u32)>,
}

impl RoomSpec {
    /// Fully walkable room
    pub fn open(level: Address, origin: Point, width: u32, height: u32) -> Self {
        Self {
            level,
            origin,
            width,
            height,
            blocked: Vec::new(),
        }
    }
}

pub struct WorldFixture {
    memory: MockMemoryReader,
    cursor: u64,
}

impl WorldFixture {
    pub fn new() -> Self {
        let mut fixture = Self {
            memory: MockMemoryBuilder::new()
                .image_size(BUILTIN_IMAGE_SIZE)
                .build(),
            cursor: HEAP_BASE,
        };
        // Map the whole (empty) unit table
        let table = fixture.unit_table();
        let table_len = units::TABLE_TYPES * units::BUCKETS * units::PTR_SIZE;
        fixture.memory.write(table, &vec![0u8; table_len]);
        fixture
    }

    pub fn layouts(&self) -> LayoutSet {
        builtin_layouts()
    }

    /// Snapshot of the memory built so far
    pub fn reader(&self) -> MockMemoryReader {
        self.memory.clone()
    }

    pub fn source(&self) -> MockSource {
        MockSource::new(self.reader())
    }

    pub fn unit_table(&self) -> u64 {
        self.memory.info().base_address + builtin_layouts().globals.unit_table
    }

    /// Reserve `size` zeroed bytes on the fake heap
    pub fn alloc(&mut self, size: usize) -> Address {
        let address = self.cursor;
        self.memory.write(address, &vec![0u8; size.max(1)]);
        self.cursor += (size as u64 + 0xF) & !0xF;
        Address::new(address)
    }

    pub fn level(&mut self, area: u32) -> Address {
        let level = self.alloc(off::LEVEL_SIZE);
        self.memory.write_u32(level.get() + off::LEVEL_AREA, area);
        level
    }

    pub fn room(&mut self, spec: RoomSpec) -> Address {
        let room = self.alloc(off::ROOM_SIZE);
        let room_ex = self.alloc(off::ROOM_EX_SIZE);
        let collision = self.alloc(off::COLLISION_SIZE);

        let count = (spec.width * spec.height) as usize;
        let cells = self.alloc(count * 2);
        for (x, y) in &spec.blocked {
            let index = (y * spec.width + x) as u64;
            self.memory.write_u16(cells.get() + index * 2, 0x0001);
        }

        self.memory
            .write_u32(collision.get(), spec.origin.x as u32);
        self.memory
            .write_u32(collision.get() + 0x04, spec.origin.y as u32);
        self.memory.write_u32(collision.get() + 0x08, spec.width);
        self.memory.write_u32(collision.get() + 0x0C, spec.height);
        self.memory
            .write_u64(collision.get() + off::COLLISION_CELLS, cells.get());

        self.memory
            .write_u64(room_ex.get() + off::ROOM_EX_LEVEL, spec.level.get());
        self.memory
            .write_u64(room.get() + off::ROOM_EX, room_ex.get());
        self.memory
            .write_u64(room.get() + off::ROOM_COLLISION, collision.get());
        room
    }

    /// Replace the neighbor list of `room`
    pub fn link(&mut self, room: Address, neighbors: &[Address]) {
        let array = self.alloc(neighbors.len() * units::PTR_SIZE);
        for (i, neighbor) in neighbors.iter().enumerate() {
            self.memory
                .write_u64(array.get() + (i * units::PTR_SIZE) as u64, neighbor.get());
        }
        self.memory.write_u64(room.get() + off::ROOM_NEAR, array.get());
        self.memory
            .write_u32(room.get() + off::ROOM_NEAR_COUNT, neighbors.len() as u32);
    }

    pub fn set_near_count(&mut self, room: Address, count: u32) {
        self.memory
            .write_u32(room.get() + off::ROOM_NEAR_COUNT, count);
    }

    /// Point the room's extended record at unmapped memory
    pub fn corrupt_room(&mut self, room: Address) {
        self.memory.write_u64(room.get() + off::ROOM_EX, UNMAPPED);
    }

    pub fn corrupt_collision(&mut self, room: Address) {
        self.memory
            .write_u64(room.get() + off::ROOM_COLLISION, UNMAPPED);
    }

    /// Raw unit; prepended to the list for `list_type`
    #[allow(clippy::too_many_arguments)]
    pub fn unit(
        &mut self,
        list_type: u32,
        unit_type: u32,
        txt_file_no: u32,
        unit_id: u32,
        mode: u32,
        position: Point,
        room: Option<Address>,
    ) -> Address {
        let unit = self.alloc(off::UNIT_SIZE);
        let path = self.alloc(off::PATH_SIZE);

        // Players and monsters move; everything else sits on a static path
        let (x_off, y_off) = if unit_type <= 1 {
            (off::PATH_DYN_X, off::PATH_DYN_Y)
        } else {
            (off::PATH_STATIC_X, off::PATH_STATIC_Y)
        };
        self.memory
            .write_u16(path.get() + x_off, position.x as u16);
        self.memory
            .write_u16(path.get() + y_off, position.y as u16);
        if let Some(room) = room {
            self.memory.write_u64(path.get() + off::PATH_ROOM, room.get());
        }

        let u = unit.get();
        self.memory.write_u32(u + off::UNIT_TYPE, unit_type);
        self.memory.write_u32(u + off::UNIT_TXT, txt_file_no);
        self.memory.write_u32(u + off::UNIT_ID, unit_id);
        self.memory.write_u32(u + off::UNIT_MODE, mode);
        self.memory.write_u64(u + off::UNIT_PATH, path.get());

        let bucket = self.bucket(list_type, unit_id);
        let head = self.read_u64(bucket);
        self.memory.write_u64(u + off::UNIT_NEXT, head);
        self.memory.write_u64(bucket, u);
        unit
    }

    pub fn player(
        &mut self,
        name: &str,
        unit_id: u32,
        position: Point,
        room: Option<Address>,
        controlled: bool,
    ) -> Address {
        let unit = self.unit(0, 0, 0, unit_id, 1, position, room);

        let data = self.alloc(0x10);
        let bytes = name.as_bytes();
        self.memory
            .write(data.get(), &bytes[..bytes.len().min(15)]);
        self.memory.write_u64(unit.get() + off::UNIT_DATA, data.get());

        let inventory = self.alloc(off::INVENTORY_SIZE);
        if controlled {
            self.memory
                .write_u64(inventory.get() + off::INVENTORY_OWNER, 0xC0FF_EE00);
        }
        self.memory
            .write_u64(unit.get() + off::UNIT_INVENTORY, inventory.get());
        unit
    }

    pub fn monster(
        &mut self,
        txt_file_no: u32,
        unit_id: u32,
        position: Point,
        type_flags: u8,
        stats: &[(u16, i32)],
    ) -> Address {
        let unit = self.unit(1, 1, txt_file_no, unit_id, 1, position, None);
        let data = self.alloc(off::MONSTER_DATA_SIZE);
        self.memory
            .write(data.get() + off::MONSTER_FLAGS, &[type_flags]);
        self.memory.write_u64(unit.get() + off::UNIT_DATA, data.get());
        self.stats(unit, stats);
        unit
    }

    pub fn object(
        &mut self,
        txt_file_no: u32,
        unit_id: u32,
        position: Point,
        interact_type: u8,
    ) -> Address {
        let unit = self.unit(2, 2, txt_file_no, unit_id, 0, position, None);
        let data = self.alloc(off::OBJECT_DATA_SIZE);
        self.memory
            .write(data.get() + off::OBJECT_INTERACT, &[interact_type]);
        self.memory.write_u64(unit.get() + off::UNIT_DATA, data.get());
        unit
    }

    #[allow(clippy::too_many_arguments)]
    pub fn item(
        &mut self,
        txt_file_no: u32,
        unit_id: u32,
        position: Point,
        mode: u32,
        quality: u32,
        flags: u32,
        stats: &[(u16, i32)],
    ) -> Address {
        let unit = self.unit(4, 4, txt_file_no, unit_id, mode, position, None);
        let data = self.alloc(off::ITEM_DATA_SIZE);
        self.memory
            .write_u32(data.get() + off::ITEM_QUALITY, quality);
        self.memory.write_u32(data.get() + off::ITEM_FLAGS, flags);
        self.memory.write_u64(unit.get() + off::UNIT_DATA, data.get());
        self.stats(unit, stats);
        unit
    }

    /// Attach a stat list (layer 0) to `unit`
    pub fn stats(&mut self, unit: Address, stats: &[(u16, i32)]) {
        if stats.is_empty() {
            return;
        }
        let list = self.alloc(off::STAT_LIST_SIZE);
        let array = self.alloc(stats.len() * 8);
        for (i, (id, value)) in stats.iter().enumerate() {
            let entry = array.get() + (i * 8) as u64;
            self.memory.write_u16(entry + 0x02, *id);
            self.memory.write_u32(entry + 0x04, *value as u32);
        }
        self.memory
            .write_u64(list.get() + off::STAT_LIST_STATS, array.get());
        self.memory
            .write_u32(list.get() + off::STAT_LIST_COUNT, stats.len() as u32);
        self.memory
            .write_u64(unit.get() + off::UNIT_STATS, list.get());
    }

    pub fn set_unit_type(&mut self, unit: Address, unit_type: u32) {
        self.memory.write_u32(unit.get() + off::UNIT_TYPE, unit_type);
    }

    pub fn set_list_next(&mut self, unit: Address, next: Address) {
        self.memory.write_u64(unit.get() + off::UNIT_NEXT, next.get());
    }

    pub fn corrupt_unit(&mut self, unit: Address) {
        self.memory.write_u64(unit.get() + off::UNIT_PATH, UNMAPPED);
    }

    pub fn write_u32(&mut self, address: u64, value: u32) {
        self.memory.write_u32(address, value);
    }

    fn bucket(&self, list_type: u32, unit_id: u32) -> u64 {
        let slot = list_type as usize * units::BUCKETS + (unit_id as usize % units::BUCKETS);
        self.unit_table() + (slot * units::PTR_SIZE) as u64
    }

    fn read_u64(&self, address: u64) -> u64 {
        use crate::memory::ReadMemory;
        self.memory.read_u64(address).unwrap_or_default()
    }
}

impl Default for WorldFixture {
    fn default() -> Self {
        Self::new()
    }
}
