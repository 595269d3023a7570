//! Versioned structure layouts
//!
//! A [`StructLayout`] names the fields of one game structure with their
//! offsets and widths. Layouts for one game build are grouped in a
//! [`LayoutSet`] together with global offsets and a build fingerprint; a
//! [`LayoutRegistry`] picks the set matching the attached process once per
//! context acquisition.

mod builtin;
mod loader;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::ProcessInfo;

pub use builtin::{BUILTIN_IMAGE_SIZE, BUILTIN_VERSION, builtin_layouts};
pub use loader::{load_layouts, save_layouts};

/// Structure names used as keys in a [`LayoutSet`]
pub mod names {
    pub const UNIT: &str = "unit";
    pub const PATH: &str = "path";
    pub const ROOM: &str = "room";
    pub const ROOM_EX: &str = "room_ex";
    pub const LEVEL: &str = "level";
    pub const COLLISION: &str = "collision";
    pub const PLAYER_DATA: &str = "player_data";
    pub const MONSTER_DATA: &str = "monster_data";
    pub const OBJECT_DATA: &str = "object_data";
    pub const ITEM_DATA: &str = "item_data";
    pub const INVENTORY: &str = "inventory";
    pub const STAT_LIST: &str = "stat_list";
    pub const STAT: &str = "stat";

    pub const ALL: &[&str] = &[
        UNIT,
        PATH,
        ROOM,
        ROOM_EX,
        LEVEL,
        COLLISION,
        PLAYER_DATA,
        MONSTER_DATA,
        OBJECT_DATA,
        ITEM_DATA,
        INVENTORY,
        STAT_LIST,
        STAT,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I32,
    U64,
    /// Pointer into the target process (8 bytes)
    Ptr,
    Bytes(usize),
}

impl FieldKind {
    pub fn width(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::I32 => 4,
            Self::U64 | Self::Ptr => 8,
            Self::Bytes(len) => *len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// One past the last byte of the field; `None` if that overflows
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.kind.width())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub name: String,
    /// Bytes read for one record
    pub size: usize,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl StructLayout {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            size,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, offset: usize, kind: FieldKind) -> Self {
        self.fields
            .insert(name.to_string(), FieldSpec { offset, kind });
        self
    }

    pub fn field(&self, name: &str) -> Result<&FieldSpec> {
        self.fields.get(name).ok_or_else(|| {
            Error::LayoutMismatch(format!("{} has no field '{}'", self.name, name))
        })
    }

    /// Check that every field lies within the record
    pub fn validate(&self) -> Result<()> {
        for (field, spec) in &self.fields {
            if spec.end().is_none_or(|end| end > self.size) {
                return Err(Error::LayoutMismatch(format!(
                    "{}.{} (offset 0x{:X}, {} bytes) exceeds record size 0x{:X}",
                    self.name,
                    field,
                    spec.offset,
                    spec.kind.width(),
                    self.size
                )));
            }
        }
        Ok(())
    }
}

/// Offsets of global tables, relative to the main module base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Globals {
    pub unit_table: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSet {
    pub version: String,
    /// Main module image size of the build this set describes
    #[serde(default)]
    pub image_size: Option<u32>,
    pub globals: Globals,
    pub structs: BTreeMap<String, StructLayout>,
}

impl LayoutSet {
    pub fn get(&self, name: &str) -> Result<&StructLayout> {
        self.structs.get(name).ok_or_else(|| {
            Error::LayoutMismatch(format!(
                "layout set {} has no '{}' structure",
                self.version, name
            ))
        })
    }

    pub fn insert(&mut self, layout: StructLayout) {
        self.structs.insert(layout.name.clone(), layout);
    }

    pub fn validate(&self) -> Result<()> {
        for name in names::ALL {
            self.get(name)?;
        }
        for (key, layout) in &self.structs {
            if key != &layout.name {
                return Err(Error::LayoutMismatch(format!(
                    "layout stored as '{}' is named '{}'",
                    key, layout.name
                )));
            }
            layout.validate()?;
        }
        if self.globals.unit_table == 0 {
            return Err(Error::LayoutMismatch(format!(
                "layout set {} has no unit table offset",
                self.version
            )));
        }
        Ok(())
    }
}

/// All known layout sets, most specific first
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    sets: Vec<LayoutSet>,
}

impl LayoutRegistry {
    pub fn new(sets: Vec<LayoutSet>) -> Self {
        Self { sets }
    }

    /// Registry holding only the compiled-in layout set
    pub fn builtin() -> Self {
        Self::new(vec![builtin_layouts()])
    }

    /// Add a set ahead of the existing ones
    pub fn prepend(&mut self, set: LayoutSet) {
        self.sets.insert(0, set);
    }

    pub fn sets(&self) -> &[LayoutSet] {
        &self.sets
    }

    /// Pick the layout set for an attached process.
    ///
    /// An explicit `version` wins; otherwise the main module image size is
    /// matched against each set's fingerprint.
    pub fn resolve(&self, info: &ProcessInfo, version: Option<&str>) -> Result<&LayoutSet> {
        let found = match version {
            Some(version) => self.sets.iter().find(|set| set.version == version),
            None => self
                .sets
                .iter()
                .find(|set| set.image_size == Some(info.image_size)),
        };

        match found {
            Some(set) => {
                debug!(
                    "Resolved layout set {} for pid {} (image size 0x{:X})",
                    set.version, info.pid, info.image_size
                );
                Ok(set)
            }
            None => Err(Error::LayoutMismatch(match version {
                Some(version) => format!("no layout set named '{}'", version),
                None => format!(
                    "no layout set for image size 0x{:X} (known: {})",
                    info.image_size,
                    self.sets
                        .iter()
                        .map(|s| s.version.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })),
        }
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(image_size: u32) -> ProcessInfo {
        ProcessInfo {
            pid: 1,
            base_address: 0x1_4000_0000,
            image_size,
        }
    }

    #[test]
    fn test_builtin_set_is_valid() {
        builtin_layouts().validate().unwrap();
    }

    #[test]
    fn test_field_outside_record_rejected() {
        let layout = StructLayout::new("path", 0x10).with_field("room", 0x0C, FieldKind::Ptr);
        assert!(matches!(layout.validate(), Err(Error::LayoutMismatch(_))));
    }

    #[test]
    fn test_missing_structure_rejected() {
        let mut set = builtin_layouts();
        set.structs.remove(names::LEVEL);
        assert!(matches!(set.validate(), Err(Error::LayoutMismatch(_))));
    }

    #[test]
    fn test_resolve_by_image_size() {
        let registry = LayoutRegistry::builtin();
        let set = registry.resolve(&info(BUILTIN_IMAGE_SIZE), None).unwrap();
        assert_eq!(set.version, BUILTIN_VERSION);
    }

    #[test]
    fn test_resolve_unknown_build_fails() {
        let registry = LayoutRegistry::builtin();
        let err = registry.resolve(&info(0x1234), None).unwrap_err();
        assert!(matches!(err, Error::LayoutMismatch(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_explicit_version_overrides_fingerprint() {
        let mut custom = builtin_layouts();
        custom.version = "custom".to_string();
        custom.image_size = None;
        let mut registry = LayoutRegistry::builtin();
        registry.prepend(custom);

        let set = registry.resolve(&info(0x1234), Some("custom")).unwrap();
        assert_eq!(set.version, "custom");
        assert!(registry.resolve(&info(0x1234), Some("missing")).is_err());
    }
}
