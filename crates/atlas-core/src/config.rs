//! On-disk configuration (TOML).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::area::PoiRule;
use crate::error::{Error, Result};
use crate::layout::{LayoutRegistry, load_layouts};
use crate::memory::ProcessSelector;
use crate::memory::layout::timing;
use crate::snapshot::PublisherConfig;
use crate::unit::UnitLimits;
use crate::world::WalkLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which process to attach to
    pub process: ProcessSelector,
    pub poll_interval_ms: u64,
    /// Delay between attach attempts while the game is not running
    pub reconnect_delay_ms: u64,
    pub max_rooms: usize,
    pub max_units_per_list: usize,
    /// Layout set tried before the built-in one
    pub layout_file: Option<PathBuf>,
    /// Force a layout set by version name instead of fingerprinting
    pub layout_version: Option<String>,
    /// Walk into neighboring levels as well as the player's own
    pub cross_levels: bool,
    /// Extra point-of-interest rules, after the built-in ones
    pub poi: Vec<PoiRule>,
    /// Item filter file for the loot log
    pub loot_filter: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process: ProcessSelector::default(),
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            reconnect_delay_ms: timing::RECONNECT_DELAY_MS,
            max_rooms: WalkLimits::default().max_rooms,
            max_units_per_list: UnitLimits::default().max_per_list,
            layout_file: None,
            layout_version: None,
            cross_levels: false,
            poi: Vec::new(),
            loot_filter: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.max_rooms == 0 || self.max_units_per_list == 0 {
            return Err(Error::Config("walk bounds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Built-in layouts, preceded by the configured layout file if any
    pub fn layout_registry(&self) -> Result<LayoutRegistry> {
        let mut registry = LayoutRegistry::builtin();
        if let Some(path) = &self.layout_file {
            let set = load_layouts(path)?;
            info!("Using layout file {:?} ({})", path, set.version);
            registry.prepend(set);
        }
        Ok(registry)
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        let mut builder = PublisherConfig::builder()
            .walk_limits(WalkLimits {
                max_rooms: self.max_rooms,
            })
            .unit_limits(UnitLimits {
                max_per_list: self.max_units_per_list,
                ..UnitLimits::default()
            })
            .cross_levels(self.cross_levels)
            .poi_rules(self.poi.clone());
        if let Some(version) = &self.layout_version {
            builder = builder.layout_version(version.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::PoiKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
poll_interval_ms = 250
layout_version = "d2r-retail"

[process]
pid = 1234

[[poi]]
kind = "custom"
label = "Chest"
match = "object"
codes = [5]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.process, ProcessSelector::Pid(1234));
        assert_eq!(config.max_rooms, WalkLimits::default().max_rooms);
        assert_eq!(config.poi.len(), 1);
        assert_eq!(config.poi[0].kind, PoiKind::Custom);

        let publisher = config.publisher_config();
        assert_eq!(publisher.layout_version.as_deref(), Some("d2r-retail"));
        assert_eq!(publisher.poi_rules.len(), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_ms = 0").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/atlas.toml").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_round_trip_default() {
        let text = toml::to_string(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
