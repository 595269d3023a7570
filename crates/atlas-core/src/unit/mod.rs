//! Dynamic entities: players, monsters, objects and items.

mod reader;
mod records;
mod stats;

use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr, IntoStaticStr};

use crate::geometry::Point;
use crate::memory::Address;

pub use reader::{EntityReader, EntitySnapshot, PlayerLocation, UnitLimits};
pub use records::{
    RawInventory, RawItemData, RawMonsterData, RawObjectData, RawPlayerData, RawStat, RawStatList,
    RawUnit,
};
pub use stats::{Stat, StatSet};

/// Unit type discriminator as stored in the unit record
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum UnitKind {
    Player = 0,
    Monster = 1,
    Object = 2,
    Missile = 3,
    Item = 4,
    Tile = 5,
}

impl UnitKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::from_repr(value)
    }

    /// Kinds kept in a snapshot
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Player | Self::Monster | Self::Object | Self::Item)
    }

    /// Kinds whose position comes from the dynamic half of the path
    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::Player | Self::Monster | Self::Missile)
    }
}

/// Monster type flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonsterFlags(pub u8);

impl MonsterFlags {
    pub const OTHER: u8 = 0x01;
    pub const SUPER_UNIQUE: u8 = 0x02;
    pub const CHAMPION: u8 = 0x04;
    pub const UNIQUE: u8 = 0x08;
    pub const MINION: u8 = 0x10;
    pub const POSSESSED: u8 = 0x20;
    pub const GHOSTLY: u8 = 0x40;
    pub const MULTISHOT: u8 = 0x80;

    pub fn contains(&self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn intersects(&self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    pub fn monster_type(&self) -> MonsterType {
        if self.contains(Self::SUPER_UNIQUE) {
            MonsterType::SuperUnique
        } else if self.contains(Self::UNIQUE) {
            MonsterType::Unique
        } else if self.contains(Self::CHAMPION) {
            MonsterType::Champion
        } else if self.contains(Self::MINION) {
            MonsterType::Minion
        } else {
            MonsterType::Regular
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, Display,
)]
pub enum MonsterType {
    Regular,
    Minion,
    Champion,
    Unique,
    SuperUnique,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    Display,
)]
pub enum Immunity {
    Physical,
    Magic,
    Fire,
    Lightning,
    Cold,
    Poison,
}

impl Immunity {
    pub const ALL: [Immunity; 6] = [
        Self::Physical,
        Self::Magic,
        Self::Fire,
        Self::Lightning,
        Self::Cold,
        Self::Poison,
    ];

    /// Resistance stat that grants this immunity at 100 or more
    pub fn resist_stat(&self) -> Stat {
        match self {
            Self::Physical => Stat::DamageResist,
            Self::Magic => Stat::MagicResist,
            Self::Fire => Stat::FireResist,
            Self::Lightning => Stat::LightningResist,
            Self::Cold => Stat::ColdResist,
            Self::Poison => Stat::PoisonResist,
        }
    }

    pub fn from_stats(stats: &StatSet) -> Vec<Immunity> {
        Self::ALL
            .into_iter()
            .filter(|immunity| stats.get(immunity.resist_stat()) >= 100)
            .collect()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum ItemQuality {
    #[default]
    Unknown = 0,
    Inferior = 1,
    Normal = 2,
    Superior = 3,
    Magic = 4,
    Set = 5,
    Rare = 6,
    Unique = 7,
    Craft = 8,
    Tempered = 9,
}

impl ItemQuality {
    pub fn from_u32(value: u32) -> Self {
        Self::from_repr(value).unwrap_or_default()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum ItemMode {
    #[default]
    Stored = 0,
    Equip = 1,
    InBelt = 2,
    OnGround = 3,
    OnCursor = 4,
    Dropping = 5,
    Socketed = 6,
}

impl ItemMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::from_repr(value)
    }

    /// Lying on the ground or about to land there
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::OnGround | Self::Dropping)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemFlags(pub u32);

impl ItemFlags {
    pub const IDENTIFIED: u32 = 0x0000_0010;
    pub const SOCKETED: u32 = 0x0000_0800;
    pub const ETHEREAL: u32 = 0x0040_0000;

    pub fn is_identified(&self) -> bool {
        self.0 & Self::IDENTIFIED != 0
    }

    pub fn is_socketed(&self) -> bool {
        self.0 & Self::SOCKETED != 0
    }

    pub fn is_ethereal(&self) -> bool {
        self.0 & Self::ETHEREAL != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPayload {
    Player {
        name: String,
        controlled: bool,
    },
    Monster {
        flags: MonsterFlags,
        monster_type: MonsterType,
        immunities: Vec<Immunity>,
    },
    Object {
        interact_type: u8,
        selectable: bool,
    },
    Item {
        quality: ItemQuality,
        flags: ItemFlags,
        /// `None` when the raw mode is out of range
        mode: Option<ItemMode>,
        stats: StatSet,
    },
}

/// One decoded unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub kind: UnitKind,
    pub unit_id: u32,
    /// Row in the kind's txt table (monster class, object class, item code index)
    pub type_code: u32,
    pub mode: u32,
    pub position: Point,
    /// Where the unit was found; identity only
    pub address: Address,
    pub payload: UnitPayload,
}

impl UnitRecord {
    pub fn player_name(&self) -> Option<&str> {
        match &self.payload {
            UnitPayload::Player { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self.payload, UnitPayload::Player { controlled: true, .. })
    }

    pub fn monster_flags(&self) -> Option<MonsterFlags> {
        match self.payload {
            UnitPayload::Monster { flags, .. } => Some(flags),
            _ => None,
        }
    }

    pub fn item_stats(&self) -> Option<&StatSet> {
        match &self.payload {
            UnitPayload::Item { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

/// Units of one cycle, partitioned by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCollection {
    pub players: Vec<UnitRecord>,
    pub monsters: Vec<UnitRecord>,
    pub objects: Vec<UnitRecord>,
    pub items: Vec<UnitRecord>,
}

impl UnitCollection {
    pub fn push(&mut self, unit: UnitRecord) {
        match unit.kind {
            UnitKind::Player => self.players.push(unit),
            UnitKind::Monster => self.monsters.push(unit),
            UnitKind::Object => self.objects.push(unit),
            UnitKind::Item => self.items.push(unit),
            UnitKind::Missile | UnitKind::Tile => {}
        }
    }

    pub fn len(&self) -> usize {
        self.players.len() + self.monsters.len() + self.objects.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Order every list by unit id so output does not depend on bucket layout
    pub fn sort(&mut self) {
        for list in [
            &mut self.players,
            &mut self.monsters,
            &mut self.objects,
            &mut self.items,
        ] {
            list.sort_by_key(|unit| unit.unit_id);
        }
    }

    pub fn controlled_player(&self) -> Option<&UnitRecord> {
        self.players.iter().find(|unit| unit.is_controlled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monster_type_priority() {
        let flags = MonsterFlags(MonsterFlags::SUPER_UNIQUE | MonsterFlags::UNIQUE);
        assert_eq!(flags.monster_type(), MonsterType::SuperUnique);
        assert_eq!(
            MonsterFlags(MonsterFlags::CHAMPION).monster_type(),
            MonsterType::Champion
        );
        assert_eq!(MonsterFlags(0).monster_type(), MonsterType::Regular);
    }

    #[test]
    fn test_immunities_from_resists() {
        let mut stats = StatSet::default();
        stats.insert(Stat::FireResist.id(), 100);
        stats.insert(Stat::ColdResist.id(), 99);
        stats.insert(Stat::PoisonResist.id(), 150);
        assert_eq!(
            Immunity::from_stats(&stats),
            vec![Immunity::Fire, Immunity::Poison]
        );
    }

    #[test]
    fn test_item_enums() {
        assert_eq!(ItemQuality::from_u32(7), ItemQuality::Unique);
        assert_eq!(ItemQuality::from_u32(42), ItemQuality::Unknown);
        assert_eq!(ItemMode::from_u32(3), Some(ItemMode::OnGround));
        assert!(ItemMode::Dropping.is_dropped());
        assert!(!ItemMode::Equip.is_dropped());

        let flags = ItemFlags(ItemFlags::ETHEREAL | ItemFlags::IDENTIFIED);
        assert!(flags.is_ethereal());
        assert!(flags.is_identified());
        assert!(!flags.is_socketed());
    }

    #[test]
    fn test_collection_drops_untracked_kinds() {
        let unit = |kind, unit_id| UnitRecord {
            kind,
            unit_id,
            type_code: 0,
            mode: 0,
            position: Point::default(),
            address: Address::NULL,
            payload: UnitPayload::Object {
                interact_type: 0,
                selectable: false,
            },
        };
        let mut units = UnitCollection::default();
        units.push(unit(UnitKind::Object, 9));
        units.push(unit(UnitKind::Object, 3));
        units.push(unit(UnitKind::Missile, 4));
        units.sort();
        assert_eq!(units.len(), 2);
        assert_eq!(units.objects[0].unit_id, 3);
    }
}
