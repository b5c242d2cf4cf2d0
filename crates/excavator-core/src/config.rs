//! Excavation tuning parameters and their YAML loader.
//!
//! The controller never reads global settings: an [`ExcavationConfig`] is
//! handed to it at construction and may be replaced between ticks with
//! [`crate::ExcavationController::set_config`].

use std::path::Path;

use excavator_types::CellType;
use excavator_world::BreakPolicy;
use serde::Deserialize;

use crate::search::SearchSettings;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Settings that shape target search, pruning, and goal selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExcavationConfig {
    /// Track inventory capacity and stop or narrow targets when full.
    #[serde(default)]
    pub check_inventory: bool,

    /// Ticks between background rescans. Zero disables periodic rescans.
    #[serde(default = "default_goal_update_interval")]
    pub goal_update_interval: u64,

    /// On path failure, blacklist the nearest candidate instead of
    /// cancelling.
    #[serde(default)]
    pub blacklist_closest_on_failure: bool,

    /// After a cancellation, path back to the most recent home waypoint.
    #[serde(default)]
    pub return_home_on_cancel: bool,

    /// Master switch for breaking cells.
    #[serde(default = "default_true")]
    pub allow_break: bool,

    /// Treat loose items of a target's drop as candidates.
    #[serde(default = "default_true")]
    pub scan_dropped_items: bool,

    /// Admit target cells diagonally adjacent to known candidates even when
    /// they are not visible.
    #[serde(default)]
    pub include_diagonals: bool,

    /// Fall back to a world scan when the cache returns fewer than
    /// `max_working_set` hits.
    #[serde(default)]
    pub extend_search_on_shortfall: bool,

    /// Working-set size cap.
    #[serde(default = "default_max_working_set")]
    pub max_working_set: usize,

    /// Never search the world: only cells seen near the agent are pursued,
    /// and an empty working set means exploring.
    #[serde(default)]
    pub legit_mine: bool,

    /// With no candidates left, wander away from the start position instead
    /// of cancelling.
    #[serde(default = "default_true")]
    pub explore_when_empty: bool,

    /// Maximum cache hits requested per target type.
    #[serde(default = "default_max_cached_scan_count")]
    pub max_cached_scan_count: usize,

    /// Horizontal radius of the brute-force world scan, in cells.
    #[serde(default = "default_search_radius")]
    pub search_radius: u32,

    /// Cell types that must never be broken.
    #[serde(default)]
    pub avoid_breaking: Vec<CellType>,
}

impl Default for ExcavationConfig {
    fn default() -> Self {
        Self {
            check_inventory: false,
            goal_update_interval: default_goal_update_interval(),
            blacklist_closest_on_failure: false,
            return_home_on_cancel: false,
            allow_break: true,
            scan_dropped_items: true,
            include_diagonals: false,
            extend_search_on_shortfall: false,
            max_working_set: default_max_working_set(),
            legit_mine: false,
            explore_when_empty: true,
            max_cached_scan_count: default_max_cached_scan_count(),
            search_radius: default_search_radius(),
            avoid_breaking: Vec::new(),
        }
    }
}

impl ExcavationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The breaking rules implied by this configuration.
    pub fn break_policy(&self) -> BreakPolicy {
        BreakPolicy {
            allow_break: self.allow_break,
            avoid_breaking: self.avoid_breaking.clone(),
        }
    }

    /// The subset of settings a world search needs, detached from the
    /// controller so it can travel to a worker thread.
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            max_cached_scan_count: self.max_cached_scan_count,
            extend_search_on_shortfall: self.extend_search_on_shortfall,
            search_radius: self.search_radius,
            scan_dropped_items: self.scan_dropped_items,
            break_policy: self.break_policy(),
        }
    }
}

const fn default_goal_update_interval() -> u64 {
    5
}

const fn default_max_working_set() -> usize {
    64
}

const fn default_max_cached_scan_count() -> usize {
    10
}

const fn default_search_radius() -> u32 {
    32
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ExcavationConfig::default();
        assert!(!config.check_inventory);
        assert_eq!(config.goal_update_interval, 5);
        assert!(config.allow_break);
        assert!(config.scan_dropped_items);
        assert_eq!(config.max_working_set, 64);
        assert_eq!(config.max_cached_scan_count, 10);
        assert_eq!(config.search_radius, 32);
        assert!(config.explore_when_empty);
        assert!(config.avoid_breaking.is_empty());
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = ExcavationConfig::parse("{}").unwrap();
        assert_eq!(config, ExcavationConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
goal_update_interval: 20
blacklist_closest_on_failure: true
avoid_breaking:
  - glass
  - clay
";
        let config = ExcavationConfig::parse(yaml).unwrap();
        assert_eq!(config.goal_update_interval, 20);
        assert!(config.blacklist_closest_on_failure);
        assert_eq!(config.avoid_breaking, vec![CellType::Glass, CellType::Clay]);
        assert_eq!(config.max_working_set, 64);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = ExcavationConfig::parse("max_working_set: [not a number");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn break_policy_carries_avoid_list() {
        let config = ExcavationConfig {
            allow_break: false,
            avoid_breaking: vec![CellType::Glass],
            ..ExcavationConfig::default()
        };
        let policy = config.break_policy();
        assert!(!policy.allow_break);
        assert_eq!(policy.avoid_breaking, vec![CellType::Glass]);
    }
}
