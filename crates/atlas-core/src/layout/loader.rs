use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::layout::LayoutSet;

/// Load and validate a layout set from a JSON file
pub fn load_layouts<P: AsRef<Path>>(path: P) -> Result<LayoutSet> {
    let content = fs::read_to_string(&path)?;
    let set: LayoutSet = serde_json::from_str(&content)?;
    set.validate()?;
    info!(
        "Loaded layout set {} from {}",
        set.version,
        path.as_ref().display()
    );
    Ok(set)
}

pub fn save_layouts<P: AsRef<Path>>(path: P, set: &LayoutSet) -> Result<()> {
    let content = serde_json::to_string_pretty(set)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::layout::{FieldKind, FieldSpec, builtin_layouts, names};
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let set = builtin_layouts();
        save_layouts(temp_file.path(), &set).unwrap();

        let loaded = load_layouts(temp_file.path()).unwrap();
        assert_eq!(loaded, set);
        assert_eq!(
            loaded.get(names::PLAYER_DATA).unwrap().field("name").unwrap().kind,
            FieldKind::Bytes(16)
        );
    }

    #[test]
    fn test_load_rejects_invalid_set() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut set = builtin_layouts();
        set.structs.remove(names::ROOM);
        save_layouts(temp_file.path(), &set).unwrap();

        assert!(matches!(
            load_layouts(temp_file.path()),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_load_rejects_overflowing_field() {
        for kind in [FieldKind::U32, FieldKind::Bytes(usize::MAX)] {
            let temp_file = NamedTempFile::new().unwrap();
            let mut set = builtin_layouts();
            let room = set.structs.get_mut(names::ROOM).unwrap();
            room.fields.insert(
                "near_count".to_string(),
                FieldSpec {
                    offset: usize::MAX,
                    kind,
                },
            );
            save_layouts(temp_file.path(), &set).unwrap();

            assert!(matches!(
                load_layouts(temp_file.path()),
                Err(Error::LayoutMismatch(_))
            ));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_layouts("does-not-exist.json").unwrap_err();
        assert!(err.is_not_found());
    }
}
