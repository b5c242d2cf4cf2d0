//! Engine configuration loaded from `excavator-config.yaml`.
//!
//! The file has three sections: `excavation` (handed to the controller
//! unchanged), `logging`, and `demo` (world generation and run length).
//! Every field has a default, so an empty or missing file is valid.

use std::path::{Path, PathBuf};

use excavator_core::{ConfigError, ExcavationConfig};
use excavator_types::CellType;
use serde::Deserialize;

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "excavator-config.yaml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "EXCAVATOR_CONFIG";

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct EngineConfig {
    /// Controller settings.
    #[serde(default)]
    pub excavation: ExcavationConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Demo world and run settings.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Demo world and run settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemoConfig {
    /// Seed for world generation.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Regions loaded in every direction from the origin region.
    #[serde(default = "default_region_radius")]
    pub region_radius: i32,
    /// Cell types to excavate.
    #[serde(default = "default_targets")]
    pub targets: Vec<CellType>,
    /// Items of the first target to collect. Zero means no limit.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Tick budget for the run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Wall-clock pause between ticks. Zero runs as fast as possible.
    #[serde(default)]
    pub tick_interval_ms: u64,
    /// Ticks without progress before the walker reports a path failure.
    #[serde(default = "default_stuck_ticks")]
    pub stuck_ticks: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            region_radius: default_region_radius(),
            targets: default_targets(),
            quantity: default_quantity(),
            max_ticks: default_max_ticks(),
            tick_interval_ms: 0,
            stuck_ticks: default_stuck_ticks(),
        }
    }
}

impl EngineConfig {
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
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file.
    File(PathBuf),
    /// The file did not exist; defaults were used.
    Defaults(PathBuf),
}

/// Resolve the configuration path from the environment.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the engine configuration from `path`, falling back to defaults when
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<(EngineConfig, ConfigSource), ConfigError> {
    if path.exists() {
        let config = EngineConfig::from_file(path)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    } else {
        Ok((EngineConfig::default(), ConfigSource::Defaults(path.to_path_buf())))
    }
}

fn default_level() -> String {
    "info".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_region_radius() -> i32 {
    2
}

fn default_targets() -> Vec<CellType> {
    vec![CellType::Sand]
}

const fn default_quantity() -> u32 {
    32
}

const fn default_max_ticks() -> u64 {
    5_000
}

const fn default_stuck_ticks() -> u32 {
    20
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::parse("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.demo.targets, vec![CellType::Sand]);
    }

    #[test]
    fn sections_override_independently() {
        let yaml = r"
excavation:
  legit_mine: true
  avoid_breaking: [glass]
logging:
  json: true
demo:
  seed: 7
  targets: [gravel, sand]
  quantity: 0
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert!(config.excavation.legit_mine);
        assert_eq!(config.excavation.avoid_breaking, vec![CellType::Glass]);
        assert_eq!(config.excavation.goal_update_interval, 5);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.demo.seed, 7);
        assert_eq!(config.demo.targets, vec![CellType::Gravel, CellType::Sand]);
        assert_eq!(config.demo.quantity, 0);
        assert_eq!(config.demo.max_ticks, 5_000);
    }

    #[test]
    fn unknown_cell_names_are_rejected() {
        let result = EngineConfig::parse("demo:\n  targets: [unobtainium]\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Path::new("does/not/exist/excavator-config.yaml");
        let (config, source) = load(path).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(source, ConfigSource::Defaults(path.to_path_buf()));
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../excavator-config.yaml");
        let (config, source) = load(&path).unwrap();
        assert_eq!(source, ConfigSource::File(path));
        assert!(!config.demo.targets.is_empty());
    }
}
