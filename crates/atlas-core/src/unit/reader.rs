//! Unit table traversal.
//!
//! The game keeps active units in a hash table: one row of pointer buckets
//! per unit type, each bucket the head of a singly linked list. Lists are
//! walked with an address-keyed visited set and a length bound, since a
//! torn `list_next` can point anywhere, including back into the list.

use std::collections::HashSet;

use tracing::debug;

use crate::decode::{decode, read_struct};
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::layout::{LayoutSet, names};
use crate::memory::layout::units;
use crate::memory::{Address, ReadMemory};
use crate::unit::{
    Immunity, ItemFlags, ItemMode, ItemQuality, MonsterFlags, RawInventory, RawItemData,
    RawMonsterData, RawObjectData, RawPlayerData, RawStat, RawStatList, RawUnit, StatSet,
    UnitCollection, UnitKind, UnitPayload, UnitRecord,
};
use crate::world::{AreaId, RawPath, RoomWalker, WalkLimits};

/// Unit table rows that are read. Missiles and tiles are never tracked.
const TRACKED_LISTS: [u32; 4] = [0, 1, 2, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLimits {
    /// Maximum units followed in one bucket list
    pub max_per_list: usize,
    /// Maximum entries accepted in one stat list
    pub max_stats: u32,
}

impl Default for UnitLimits {
    fn default() -> Self {
        Self {
            max_per_list: 1024,
            max_stats: 512,
        }
    }
}

/// Where the controlled player stands in the world graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLocation {
    pub room: Address,
    pub level: Address,
    pub area: AreaId,
}

#[derive(Debug, Clone, Default)]
pub struct EntitySnapshot {
    pub units: UnitCollection,
    /// `None` when there is no controlled player or it has no room yet
    pub location: Option<PlayerLocation>,
    /// Units that failed to decode and were left out
    pub dropped: usize,
    /// Bucket lists cut short by an unreadable unit record; whatever
    /// followed the break is unknown and not counted in `dropped`
    pub broken_lists: usize,
}

impl EntitySnapshot {
    pub fn player(&self) -> Option<&UnitRecord> {
        self.units.controlled_player()
    }

    pub fn require_player(&self) -> Result<&UnitRecord> {
        self.player()
            .ok_or_else(|| Error::InvalidGameState("no controlled player".to_string()))
    }
}

pub struct EntityReader<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    layouts: &'a LayoutSet,
    limits: UnitLimits,
}

impl<'a, R: ReadMemory + ?Sized> EntityReader<'a, R> {
    pub fn new(reader: &'a R, layouts: &'a LayoutSet, limits: UnitLimits) -> Self {
        Self {
            reader,
            layouts,
            limits,
        }
    }

    pub fn read(&self) -> Result<EntitySnapshot> {
        let table = self
            .reader
            .base_address()
            .wrapping_add(self.layouts.globals.unit_table);

        let mut snapshot = EntitySnapshot::default();
        let mut seen: HashSet<Address> = HashSet::new();
        let mut controlled_room: Option<Address> = None;

        for list_type in TRACKED_LISTS {
            let row = table + (list_type as usize * units::BUCKETS * units::PTR_SIZE) as u64;
            let bytes = self
                .reader
                .read_bytes(row, units::BUCKETS * units::PTR_SIZE)?;
            let heads = bytes.chunks_exact(units::PTR_SIZE).filter_map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let head = Address::new(u64::from_le_bytes(raw));
                (!head.is_null()).then_some(head)
            });

            for head in heads {
                self.read_list(head, &mut seen, &mut snapshot, &mut controlled_room)?;
            }
        }

        snapshot.units.sort();
        // A null room means the player is between areas
        if let Some(room) = controlled_room.filter(|room| !room.is_null()) {
            snapshot.location = Some(self.locate(room)?);
        }

        debug!(
            "Units: {} players, {} monsters, {} objects, {} items ({} dropped, {} cut)",
            snapshot.units.players.len(),
            snapshot.units.monsters.len(),
            snapshot.units.objects.len(),
            snapshot.units.items.len(),
            snapshot.dropped,
            snapshot.broken_lists
        );
        Ok(snapshot)
    }

    fn read_list(
        &self,
        head: Address,
        seen: &mut HashSet<Address>,
        snapshot: &mut EntitySnapshot,
        controlled_room: &mut Option<Address>,
    ) -> Result<()> {
        let mut next = head;
        let mut steps = 0usize;

        while !next.is_null() && steps < self.limits.max_per_list {
            if !seen.insert(next) {
                debug!("Unit list loops back to {}", next);
                break;
            }
            steps += 1;
            let address = next;

            let raw: RawUnit = match read_struct(self.reader, self.layouts, address) {
                Ok(raw) => raw,
                Err(e) if e.is_recoverable() => {
                    debug!(
                        "Unit list from {} broken at {} after {} units, tail lost: {}",
                        head,
                        address,
                        steps - 1,
                        e
                    );
                    snapshot.broken_lists += 1;
                    break;
                }
                Err(e) => return Err(e),
            };
            next = raw.list_next;

            match self.decode_unit(address, &raw) {
                Ok(Some((record, room))) => {
                    if record.is_controlled() && controlled_room.is_none() {
                        *controlled_room = Some(room);
                    }
                    snapshot.units.push(record);
                }
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    debug!("Dropping unit {} at {}: {}", raw.unit_id, address, e);
                    snapshot.dropped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if steps >= self.limits.max_per_list && !next.is_null() {
            debug!("Unit list at {} cut after {} entries", head, steps);
        }
        Ok(())
    }

    /// Decode one unit; `None` for kinds that are not tracked
    fn decode_unit(
        &self,
        address: Address,
        raw: &RawUnit,
    ) -> Result<Option<(UnitRecord, Address)>> {
        let Some(kind) = UnitKind::from_u32(raw.unit_type).filter(UnitKind::is_tracked) else {
            return Ok(None);
        };

        let path: RawPath = read_struct(self.reader, self.layouts, require(raw.path, "path")?)?;
        let position = if kind.is_mobile() {
            Point::new(path.dynamic_x as i32, path.dynamic_y as i32)
        } else {
            Point::new(path.static_x as i32, path.static_y as i32)
        };

        let payload = match kind {
            UnitKind::Player => {
                let data: RawPlayerData =
                    read_struct(self.reader, self.layouts, require(raw.unit_data, "player data")?)?;
                let controlled = if raw.inventory.is_null() {
                    false
                } else {
                    let inventory: RawInventory =
                        read_struct(self.reader, self.layouts, raw.inventory)?;
                    !inventory.owner_marker.is_null()
                };
                UnitPayload::Player {
                    name: data.name,
                    controlled,
                }
            }
            UnitKind::Monster => {
                let data: RawMonsterData = read_struct(
                    self.reader,
                    self.layouts,
                    require(raw.unit_data, "monster data")?,
                )?;
                let flags = MonsterFlags(data.type_flags);
                let stats = self.read_stats(raw.stats)?;
                UnitPayload::Monster {
                    flags,
                    monster_type: flags.monster_type(),
                    immunities: Immunity::from_stats(&stats),
                }
            }
            UnitKind::Object => {
                let data: RawObjectData = read_struct(
                    self.reader,
                    self.layouts,
                    require(raw.unit_data, "object data")?,
                )?;
                UnitPayload::Object {
                    interact_type: data.interact_type,
                    selectable: data.interact_type != 0,
                }
            }
            UnitKind::Item => {
                let data: RawItemData =
                    read_struct(self.reader, self.layouts, require(raw.unit_data, "item data")?)?;
                UnitPayload::Item {
                    quality: ItemQuality::from_u32(data.quality),
                    flags: ItemFlags(data.flags),
                    mode: ItemMode::from_u32(raw.mode),
                    stats: self.read_stats(raw.stats)?,
                }
            }
            UnitKind::Missile | UnitKind::Tile => return Ok(None),
        };

        let record = UnitRecord {
            kind,
            unit_id: raw.unit_id,
            type_code: raw.txt_file_no,
            mode: raw.mode,
            position,
            address,
            payload,
        };
        Ok(Some((record, path.room)))
    }

    /// Base-layer stats of a unit; an absent list is an empty set
    fn read_stats(&self, address: Address) -> Result<StatSet> {
        let mut stats = StatSet::new();
        if address.is_null() {
            return Ok(stats);
        }
        let list: RawStatList = read_struct(self.reader, self.layouts, address)?;
        if list.count == 0 {
            return Ok(stats);
        }
        if list.count > self.limits.max_stats || list.stats.is_null() {
            return Err(Error::access_violation(
                list.stats.get(),
                0,
                format!("implausible stat list ({} entries)", list.count),
            ));
        }

        let layout = self.layouts.get(names::STAT)?;
        let bytes = self
            .reader
            .read_bytes(list.stats.get(), list.count as usize * layout.size)?;
        for chunk in bytes.chunks_exact(layout.size) {
            let stat: RawStat = decode(chunk, layout)?;
            if stat.layer == 0 {
                stats.insert_raw(stat.stat_id, stat.value);
            }
        }
        Ok(stats)
    }

    fn locate(&self, room: Address) -> Result<PlayerLocation> {
        let walker = RoomWalker::new(self.reader, self.layouts, WalkLimits::default());
        let (level, area) = walker.locate(room).map_err(|e| match e {
            Error::AccessViolation { .. } => {
                Error::InvalidGameState(format!("broken path chain from room {}: {}", room, e))
            }
            other => other,
        })?;
        Ok(PlayerLocation { room, level, area })
    }
}

fn require(address: Address, what: &str) -> Result<Address> {
    if address.is_null() {
        Err(Error::access_violation(0, 0, format!("null {} pointer", what)))
    } else {
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{RoomSpec, UNMAPPED, WorldFixture};
    use crate::memory::ProcessContext;
    use crate::unit::{MonsterType, Stat};

    fn read(fixture: &WorldFixture) -> Result<EntitySnapshot> {
        let reader = fixture.reader();
        let layouts = fixture.layouts();
        EntityReader::new(&reader, &layouts, UnitLimits::default()).read()
    }

    #[test]
    fn test_empty_table() {
        let fixture = WorldFixture::new();
        let snapshot = read(&fixture).unwrap();
        assert!(snapshot.units.is_empty());
        assert!(snapshot.location.is_none());
        assert!(matches!(
            snapshot.require_player(),
            Err(Error::InvalidGameState(_))
        ));
    }

    #[test]
    fn test_controlled_player_location() {
        let mut fixture = WorldFixture::new();
        let level = fixture.level(40);
        let room = fixture.room(RoomSpec::open(level, Point::new(5000, 5000), 8, 8));
        fixture.player("Remote", 2, Point::new(5003, 5004), Some(room), false);
        fixture.player("Local", 1, Point::new(5001, 5002), Some(room), true);

        let snapshot = read(&fixture).unwrap();
        let player = snapshot.require_player().unwrap();
        assert_eq!(player.player_name(), Some("Local"));
        assert_eq!(player.position, Point::new(5001, 5002));
        assert_eq!(snapshot.units.players.len(), 2);
        assert_eq!(
            snapshot.location,
            Some(PlayerLocation {
                room,
                level,
                area: AreaId(40),
            })
        );
    }

    #[test]
    fn test_player_without_room_has_no_location() {
        let mut fixture = WorldFixture::new();
        fixture.player("Local", 1, Point::new(10, 10), None, true);
        let snapshot = read(&fixture).unwrap();
        assert!(snapshot.player().is_some());
        assert!(snapshot.location.is_none());
    }

    #[test]
    fn test_broken_path_chain_is_invalid_state() {
        let mut fixture = WorldFixture::new();
        let level = fixture.level(1);
        let room = fixture.room(RoomSpec::open(level, Point::new(0, 0), 4, 4));
        fixture.corrupt_room(room);
        fixture.player("Local", 1, Point::new(1, 1), Some(room), true);
        assert!(matches!(read(&fixture), Err(Error::InvalidGameState(_))));
    }

    #[test]
    fn test_kind_from_discriminator_not_list() {
        let mut fixture = WorldFixture::new();
        // Sits in the monster row but says it is a missile
        let missile = fixture.monster(10, 77, Point::new(1, 1), 0, &[]);
        fixture.set_unit_type(missile, 3);
        fixture.object(119, 78, Point::new(2, 2), 1);

        let snapshot = read(&fixture).unwrap();
        assert!(snapshot.units.monsters.is_empty());
        assert_eq!(snapshot.units.objects.len(), 1);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn test_monster_payload() {
        let mut fixture = WorldFixture::new();
        fixture.monster(
            156,
            5,
            Point::new(300, 400),
            MonsterFlags::SUPER_UNIQUE,
            &[(Stat::FireResist.id(), 100), (Stat::ColdResist.id(), 75)],
        );

        let snapshot = read(&fixture).unwrap();
        let monster = &snapshot.units.monsters[0];
        assert_eq!(monster.type_code, 156);
        assert_eq!(monster.position, Point::new(300, 400));
        assert_eq!(
            monster.payload,
            UnitPayload::Monster {
                flags: MonsterFlags(MonsterFlags::SUPER_UNIQUE),
                monster_type: MonsterType::SuperUnique,
                immunities: vec![Immunity::Fire],
            }
        );
    }

    #[test]
    fn test_item_payload_uses_static_position() {
        let mut fixture = WorldFixture::new();
        fixture.item(
            25,
            9,
            Point::new(120, 130),
            3,
            7,
            ItemFlags::ETHEREAL,
            &[(Stat::NumSockets.id(), 4)],
        );

        let snapshot = read(&fixture).unwrap();
        let item = &snapshot.units.items[0];
        assert_eq!(item.position, Point::new(120, 130));
        match &item.payload {
            UnitPayload::Item {
                quality,
                flags,
                mode,
                stats,
            } => {
                assert_eq!(*quality, ItemQuality::Unique);
                assert!(flags.is_ethereal());
                assert_eq!(*mode, Some(ItemMode::OnGround));
                assert_eq!(stats.get(Stat::NumSockets), 4);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_bad_unit_dropped_rest_kept() {
        let mut fixture = WorldFixture::new();
        // Same bucket (ids differ by 128): list is c -> b -> a
        fixture.object(119, 1, Point::new(1, 1), 1);
        let b = fixture.object(119, 129, Point::new(2, 2), 1);
        fixture.object(119, 257, Point::new(3, 3), 1);
        fixture.corrupt_unit(b);

        let snapshot = read(&fixture).unwrap();
        let ids: Vec<u32> = snapshot.units.objects.iter().map(|u| u.unit_id).collect();
        assert_eq!(ids, vec![1, 257]);
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn test_list_cycle_terminates() {
        let mut fixture = WorldFixture::new();
        let a = fixture.object(119, 1, Point::new(1, 1), 1);
        let b = fixture.object(119, 129, Point::new(2, 2), 1);
        // b -> a -> b -> ...
        fixture.set_list_next(a, b);

        let snapshot = read(&fixture).unwrap();
        assert_eq!(snapshot.units.objects.len(), 2);
    }

    #[test]
    fn test_list_bound() {
        let mut fixture = WorldFixture::new();
        for i in 0..10 {
            fixture.object(119, 1 + i * 128, Point::new(1, 1), 1);
        }
        let reader = fixture.reader();
        let layouts = fixture.layouts();
        let limits = UnitLimits {
            max_per_list: 4,
            ..UnitLimits::default()
        };
        let snapshot = EntityReader::new(&reader, &layouts, limits).read().unwrap();
        assert_eq!(snapshot.units.objects.len(), 4);
    }

    #[test]
    fn test_implausible_stat_count_drops_unit() {
        let mut fixture = WorldFixture::new();
        let monster = fixture.monster(10, 3, Point::new(1, 1), 0, &[(Stat::FireResist.id(), 10)]);
        let reader = fixture.reader();
        let stats = reader.read_u64(monster.get() + 0x88).unwrap();
        fixture.write_u32(stats + 0x38, 1_000_000);

        let snapshot = read(&fixture).unwrap();
        assert!(snapshot.units.monsters.is_empty());
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn test_unreadable_unit_breaks_list() {
        let mut fixture = WorldFixture::new();
        let a = fixture.object(119, 1, Point::new(1, 1), 1);
        fixture.object(119, 129, Point::new(2, 2), 1);
        // List is b -> a -> (unmapped)
        fixture.set_list_next(a, Address::new(UNMAPPED));

        let snapshot = read(&fixture).unwrap();
        assert_eq!(snapshot.units.objects.len(), 2);
        assert_eq!(snapshot.broken_lists, 1);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn test_repeated_stat_does_not_overflow() {
        let mut fixture = WorldFixture::new();
        fixture.monster(
            10,
            3,
            Point::new(1, 1),
            0,
            &[(Stat::FireResist.id(), i32::MAX), (Stat::FireResist.id(), 1)],
        );

        let snapshot = read(&fixture).unwrap();
        let monster = &snapshot.units.monsters[0];
        assert_eq!(
            monster.payload,
            UnitPayload::Monster {
                flags: MonsterFlags(0),
                monster_type: MonsterType::Regular,
                immunities: vec![Immunity::Fire],
            }
        );
    }

    #[test]
    fn test_released_context_aborts_read() {
        let mut fixture = WorldFixture::new();
        fixture.monster(10, 3, Point::new(1, 1), 0, &[]);
        let reader = fixture.reader();
        let layouts = fixture.layouts();
        let mut context = ProcessContext::new(reader.clone(), reader.info());
        context.release();

        let result = EntityReader::new(&context, &layouts, UnitLimits::default()).read();
        assert!(matches!(result, Err(Error::ContextClosed)));
    }

    #[test]
    fn test_layout_mismatch_aborts_read() {
        let mut fixture = WorldFixture::new();
        fixture.object(119, 1, Point::new(1, 1), 1);
        fixture.monster(10, 3, Point::new(1, 1), 0, &[]);
        let reader = fixture.reader();
        let mut layouts = fixture.layouts();
        layouts
            .structs
            .get_mut(names::MONSTER_DATA)
            .unwrap()
            .fields
            .remove("type_flags");

        let result = EntityReader::new(&reader, &layouts, UnitLimits::default()).read();
        assert!(matches!(result, Err(Error::LayoutMismatch(_))));
    }
}
