use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Stat ids the crate knows by name
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
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
#[strum(ascii_case_insensitive)]
#[repr(u16)]
pub enum Stat {
    Strength = 0,
    Energy = 1,
    Dexterity = 2,
    Vitality = 3,
    #[strum(serialize = "MaxLife", serialize = "Max Life", serialize = "Life")]
    MaxLife = 7,
    #[strum(serialize = "MaxMana", serialize = "Max Mana", serialize = "Mana")]
    MaxMana = 9,
    #[strum(serialize = "AttackRating", serialize = "Attack Rating")]
    AttackRating = 19,
    #[strum(serialize = "MinDamage", serialize = "Min Damage")]
    MinDamage = 21,
    #[strum(serialize = "MaxDamage", serialize = "Max Damage")]
    MaxDamage = 22,
    Defense = 31,
    #[strum(serialize = "DamageReduced", serialize = "Damage Reduced")]
    DamageReduced = 34,
    #[strum(serialize = "DamageResist", serialize = "Damage Resist")]
    DamageResist = 36,
    #[strum(serialize = "MagicResist", serialize = "Magic Resist")]
    MagicResist = 37,
    #[strum(serialize = "FireResist", serialize = "Fire Resist")]
    FireResist = 39,
    #[strum(serialize = "LightningResist", serialize = "Lightning Resist")]
    LightningResist = 41,
    #[strum(serialize = "ColdResist", serialize = "Cold Resist")]
    ColdResist = 43,
    #[strum(serialize = "PoisonResist", serialize = "Poison Resist")]
    PoisonResist = 45,
    #[strum(serialize = "LifeSteal", serialize = "Life Steal")]
    LifeSteal = 60,
    #[strum(serialize = "ManaSteal", serialize = "Mana Steal")]
    ManaSteal = 62,
    #[strum(serialize = "GoldFind", serialize = "Gold Find")]
    GoldFind = 79,
    #[strum(serialize = "MagicFind", serialize = "Magic Find")]
    MagicFind = 80,
    #[strum(serialize = "IncreasedAttackSpeed", serialize = "Increased Attack Speed")]
    IncreasedAttackSpeed = 93,
    #[strum(serialize = "FasterRunWalk", serialize = "Faster Run Walk")]
    FasterRunWalk = 96,
    #[strum(serialize = "FasterHitRecovery", serialize = "Faster Hit Recovery")]
    FasterHitRecovery = 99,
    #[strum(serialize = "FasterCastRate", serialize = "Faster Cast Rate")]
    FasterCastRate = 105,
    #[strum(serialize = "AllSkills", serialize = "All Skills")]
    AllSkills = 127,
    #[strum(serialize = "NumSockets", serialize = "Sockets")]
    NumSockets = 194,
}

impl Stat {
    pub fn id(&self) -> u16 {
        *self as u16
    }

    /// Fixed-point shift applied to the raw value
    pub fn shift(&self) -> u32 {
        match self {
            Self::MaxLife | Self::MaxMana => 8,
            _ => 0,
        }
    }
}

/// Stat id to value, with fixed-point stats already shifted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSet(BTreeMap<u16, i32>);

impl StatSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw value; later entries for the same id are summed,
    /// saturating at the `i32` bounds
    pub fn insert_raw(&mut self, id: u16, raw: i32) {
        let value = match Stat::from_repr(id) {
            Some(stat) => raw >> stat.shift(),
            None => raw,
        };
        let total = self.0.entry(id).or_insert(0);
        *total = total.saturating_add(value);
    }

    pub fn insert(&mut self, id: u16, value: i32) {
        self.0.insert(id, value);
    }

    /// Value of `stat`, 0 when absent
    pub fn get(&self, stat: Stat) -> i32 {
        self.get_id(stat.id())
    }

    pub fn get_id(&self, id: u16) -> i32 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    pub fn contains(&self, stat: Stat) -> bool {
        self.0.contains_key(&stat.id())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, i32)> + '_ {
        self.0.iter().map(|(id, value)| (*id, *value))
    }
}
