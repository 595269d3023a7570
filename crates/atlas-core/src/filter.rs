//! Loot-log item filters.
//!
//! A filter file maps item names to a list of [`ItemFilter`]s; an item is
//! logged when any filter under its name matches. Keys may also be the
//! item's numeric type code, the only form that matches when no name table
//! is plugged in ([`CodeNames`](crate::export::CodeNames)).
//!
//! Numeric thresholds are reached through the [`FIELDS`] table so callers
//! can address them by [`FilterKey`] without naming struct fields.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::info;

use crate::error::Result;
use crate::export::NameResolver;
use crate::unit::{ItemQuality, Stat, StatSet, UnitPayload, UnitRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Display)]
#[strum(ascii_case_insensitive)]
pub enum FilterKey {
    Defense,
    Strength,
    Dexterity,
    Vitality,
    Energy,
    #[strum(serialize = "All Attributes", serialize = "AllAttributes")]
    AllAttributes,
    #[strum(serialize = "Max Life", serialize = "MaxLife")]
    MaxLife,
    #[strum(serialize = "Max Mana", serialize = "MaxMana")]
    MaxMana,
    #[strum(serialize = "Attack Rating", serialize = "AttackRating")]
    AttackRating,
    #[strum(serialize = "Min Damage", serialize = "MinDamage")]
    MinDamage,
    #[strum(serialize = "Max Damage", serialize = "MaxDamage")]
    MaxDamage,
    #[strum(serialize = "Damage Reduced", serialize = "DamageReduced")]
    DamageReduced,
    #[strum(serialize = "Life Steal", serialize = "LifeSteal")]
    LifeSteal,
    #[strum(serialize = "Mana Steal", serialize = "ManaSteal")]
    ManaSteal,
    #[strum(serialize = "Increased Attack Speed", serialize = "IncreasedAttackSpeed")]
    IncreasedAttackSpeed,
    #[strum(serialize = "Faster Run Walk", serialize = "FasterRunWalk")]
    FasterRunWalk,
    #[strum(serialize = "Faster Hit Recovery", serialize = "FasterHitRecovery")]
    FasterHitRecovery,
    #[strum(serialize = "Faster Cast Rate", serialize = "FasterCastRate")]
    FasterCastRate,
    #[strum(serialize = "Magic Find", serialize = "MagicFind")]
    MagicFind,
    #[strum(serialize = "Gold Find", serialize = "GoldFind")]
    GoldFind,
    #[strum(serialize = "Cold Resist", serialize = "ColdResist")]
    ColdResist,
    #[strum(serialize = "Lightning Resist", serialize = "LightningResist")]
    LightningResist,
    #[strum(serialize = "Fire Resist", serialize = "FireResist")]
    FireResist,
    #[strum(serialize = "Poison Resist", serialize = "PoisonResist")]
    PoisonResist,
    #[strum(serialize = "All Resist", serialize = "AllResist")]
    AllResist,
    #[strum(serialize = "All Skills", serialize = "AllSkills")]
    AllSkills,
}

impl FilterKey {
    /// Backing stat, `None` for keys aggregated over several stats
    pub fn stat(&self) -> Option<Stat> {
        Some(match self {
            Self::Defense => Stat::Defense,
            Self::Strength => Stat::Strength,
            Self::Dexterity => Stat::Dexterity,
            Self::Vitality => Stat::Vitality,
            Self::Energy => Stat::Energy,
            Self::MaxLife => Stat::MaxLife,
            Self::MaxMana => Stat::MaxMana,
            Self::AttackRating => Stat::AttackRating,
            Self::MinDamage => Stat::MinDamage,
            Self::MaxDamage => Stat::MaxDamage,
            Self::DamageReduced => Stat::DamageReduced,
            Self::LifeSteal => Stat::LifeSteal,
            Self::ManaSteal => Stat::ManaSteal,
            Self::IncreasedAttackSpeed => Stat::IncreasedAttackSpeed,
            Self::FasterRunWalk => Stat::FasterRunWalk,
            Self::FasterHitRecovery => Stat::FasterHitRecovery,
            Self::FasterCastRate => Stat::FasterCastRate,
            Self::MagicFind => Stat::MagicFind,
            Self::GoldFind => Stat::GoldFind,
            Self::ColdResist => Stat::ColdResist,
            Self::LightningResist => Stat::LightningResist,
            Self::FireResist => Stat::FireResist,
            Self::PoisonResist => Stat::PoisonResist,
            Self::AllSkills => Stat::AllSkills,
            Self::AllAttributes | Self::AllResist => return None,
        })
    }

    /// The item's value for this key
    pub fn value(&self, stats: &StatSet) -> i32 {
        match self {
            Self::AllAttributes => [Stat::Strength, Stat::Dexterity, Stat::Vitality, Stat::Energy]
                .into_iter()
                .map(|stat| stats.get(stat))
                .min()
                .unwrap_or(0),
            Self::AllResist => [
                Stat::FireResist,
                Stat::LightningResist,
                Stat::ColdResist,
                Stat::PoisonResist,
            ]
            .into_iter()
            .map(|stat| stats.get(stat))
            .min()
            .unwrap_or(0),
            other => other.stat().map(|stat| stats.get(stat)).unwrap_or(0),
        }
    }
}

/// Accessor pair for one numeric threshold of [`ItemFilter`]
pub struct FilterField {
    pub key: FilterKey,
    pub get: fn(&ItemFilter) -> Option<i32>,
    pub set: fn(&mut ItemFilter, Option<i32>),
}

macro_rules! item_filter {
    ($($field:ident => $key:ident, $name:literal;)*) => {
        /// Conditions on one item; every condition that is set must hold
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ItemFilter {
            #[serde(rename = "Qualities", skip_serializing_if = "Vec::is_empty")]
            pub qualities: Vec<ItemQuality>,
            #[serde(rename = "Sockets", skip_serializing_if = "Vec::is_empty")]
            pub sockets: Vec<i32>,
            #[serde(rename = "Ethereal", skip_serializing_if = "Option::is_none")]
            pub ethereal: Option<bool>,
            $(
                #[serde(rename = $name, skip_serializing_if = "Option::is_none")]
                pub $field: Option<i32>,
            )*
        }

        pub static FIELDS: &[FilterField] = &[
            $(
                FilterField {
                    key: FilterKey::$key,
                    get: |filter| filter.$field,
                    set: |filter, value| filter.$field = value,
                },
            )*
        ];
    };
}

item_filter! {
    defense => Defense, "Defense";
    strength => Strength, "Strength";
    dexterity => Dexterity, "Dexterity";
    vitality => Vitality, "Vitality";
    energy => Energy, "Energy";
    all_attributes => AllAttributes, "All Attributes";
    max_life => MaxLife, "Max Life";
    max_mana => MaxMana, "Max Mana";
    attack_rating => AttackRating, "Attack Rating";
    min_damage => MinDamage, "Min Damage";
    max_damage => MaxDamage, "Max Damage";
    damage_reduced => DamageReduced, "Damage Reduced";
    life_steal => LifeSteal, "Life Steal";
    mana_steal => ManaSteal, "Mana Steal";
    increased_attack_speed => IncreasedAttackSpeed, "Increased Attack Speed";
    faster_run_walk => FasterRunWalk, "Faster Run Walk";
    faster_hit_recovery => FasterHitRecovery, "Faster Hit Recovery";
    faster_cast_rate => FasterCastRate, "Faster Cast Rate";
    magic_find => MagicFind, "Magic Find";
    gold_find => GoldFind, "Gold Find";
    cold_resist => ColdResist, "Cold Resist";
    lightning_resist => LightningResist, "Lightning Resist";
    fire_resist => FireResist, "Fire Resist";
    poison_resist => PoisonResist, "Poison Resist";
    all_resist => AllResist, "All Resist";
    all_skills => AllSkills, "All Skills";
}

fn field(key: FilterKey) -> Option<&'static FilterField> {
    FIELDS.iter().find(|field| field.key == key)
}

impl ItemFilter {
    pub fn get(&self, key: FilterKey) -> Option<i32> {
        field(key).and_then(|field| (field.get)(self))
    }

    pub fn set(&mut self, key: FilterKey, value: Option<i32>) {
        if let Some(field) = field(key) {
            (field.set)(self, value);
        }
    }

    /// Thresholds that are set, in table order
    pub fn thresholds(&self) -> impl Iterator<Item = (FilterKey, i32)> + '_ {
        FIELDS
            .iter()
            .filter_map(|field| (field.get)(self).map(|value| (field.key, value)))
    }

    pub fn matches(&self, item: &UnitRecord) -> bool {
        let UnitPayload::Item {
            quality,
            flags,
            stats,
            ..
        } = &item.payload
        else {
            return false;
        };

        if !self.qualities.is_empty() && !self.qualities.contains(quality) {
            return false;
        }
        if !self.sockets.is_empty() && !self.sockets.contains(&stats.get(Stat::NumSockets)) {
            return false;
        }
        if self.ethereal.is_some_and(|ethereal| ethereal != flags.is_ethereal()) {
            return false;
        }
        self.thresholds()
            .all(|(key, threshold)| key.value(stats) >= threshold)
    }
}

/// Item name to filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootFilters {
    #[serde(default)]
    pub items: BTreeMap<String, Vec<ItemFilter>>,
}

impl LootFilters {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let filters: LootFilters = toml::from_str(&content)?;
        info!(
            "Loaded loot filters for {} items from {:?}",
            filters.items.len(),
            path.as_ref()
        );
        Ok(filters)
    }

    /// Whether `item`, known as `name`, should be logged.
    ///
    /// A name listed with no filters matches every item of that name.
    pub fn matches(&self, name: &str, item: &UnitRecord) -> bool {
        match self.items.get(name) {
            Some(filters) if filters.is_empty() => true,
            Some(filters) => filters.iter().any(|filter| filter.matches(item)),
            None => false,
        }
    }

    /// Look `item` up under its resolved name, then under its type code
    pub fn matches_item<N: NameResolver>(&self, names: &N, item: &UnitRecord) -> bool {
        let name = names.item(item.type_code);
        if self.items.contains_key(&name) {
            return self.matches(&name, item);
        }
        self.matches(&item.type_code.to_string(), item)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
