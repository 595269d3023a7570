//! Points of interest.
//!
//! Rules match units by kind and type code (objects, monsters) or by
//! monster type flags. The first matching rule classifies the unit.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::geometry::Point;
use crate::unit::{MonsterFlags, UnitKind, UnitRecord};

const WAYPOINTS: &[u32] = &[
    119, 145, 156, 157, 237, 238, 288, 323, 324, 398, 402, 429, 494, 496, 511, 539,
];
const SHRINES: &[u32] = &[2, 81, 83];
const QUEST_OBJECTS: &[u32] = &[152, 354, 356, 357, 376, 392, 393, 394, 395, 396];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoiKind {
    Waypoint,
    Shrine,
    Quest,
    SuperUnique,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum PoiMatch {
    /// Objects with one of these type codes
    Object { codes: Vec<u32> },
    /// Monsters with one of these type codes
    Monster { codes: Vec<u32> },
    /// Monsters carrying every bit of `mask`
    MonsterFlags { mask: u8 },
}

impl PoiMatch {
    pub fn matches(&self, unit: &UnitRecord) -> bool {
        match self {
            Self::Object { codes } => {
                unit.kind == UnitKind::Object && codes.contains(&unit.type_code)
            }
            Self::Monster { codes } => {
                unit.kind == UnitKind::Monster && codes.contains(&unit.type_code)
            }
            Self::MonsterFlags { mask } => unit
                .monster_flags()
                .is_some_and(|flags| flags.contains(*mask)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoiRule {
    pub kind: PoiKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub matcher: PoiMatch,
}

impl PoiRule {
    pub fn objects(kind: PoiKind, codes: &[u32]) -> Self {
        Self {
            kind,
            label: None,
            matcher: PoiMatch::Object {
                codes: codes.to_vec(),
            },
        }
    }

    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.kind.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// World coordinates
    pub position: Point,
    /// Relative to the area origin
    pub grid_position: Point,
    pub kind: PoiKind,
    pub label: String,
    pub type_code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoiRules {
    rules: Vec<PoiRule>,
}

impl PoiRules {
    pub fn new(rules: Vec<PoiRule>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            PoiRule::objects(PoiKind::Waypoint, WAYPOINTS),
            PoiRule::objects(PoiKind::Shrine, SHRINES),
            PoiRule::objects(PoiKind::Quest, QUEST_OBJECTS),
            PoiRule {
                kind: PoiKind::SuperUnique,
                label: None,
                matcher: PoiMatch::MonsterFlags {
                    mask: MonsterFlags::SUPER_UNIQUE,
                },
            },
        ])
    }

    /// Built-in rules followed by `extra`
    pub fn with_extra(extra: &[PoiRule]) -> Self {
        let mut rules = Self::builtin();
        rules.rules.extend_from_slice(extra);
        rules
    }

    pub fn rules(&self) -> &[PoiRule] {
        &self.rules
    }

    pub fn classify(&self, unit: &UnitRecord) -> Option<&PoiRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(unit))
    }

    /// One POI per matching object or monster, in input order
    pub fn collect<'a>(
        &self,
        units: impl IntoIterator<Item = &'a UnitRecord>,
        origin: Point,
    ) -> Vec<PointOfInterest> {
        units
            .into_iter()
            .filter_map(|unit| {
                let rule = self.classify(unit)?;
                Some(PointOfInterest {
                    position: unit.position,
                    grid_position: unit.position.relative_to(origin),
                    kind: rule.kind,
                    label: rule.label(),
                    type_code: unit.type_code,
                })
            })
            .collect()
    }
}

impl Default for PoiRules {
    fn default() -> Self {
        Self::builtin()
    }
}
