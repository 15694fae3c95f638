//! Configuration management for winescan.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "winescan";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "history.db";

/// Default catalog file, resolved against the working directory.
const CATALOG_FILE_NAME: &str = "wines.json";

/// Storage key the history array lives under.
pub const DEFAULT_STORAGE_KEY: &str = "scanHistory";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WINESCAN_`, sections separated
///    by `__`, e.g. `WINESCAN_HISTORY__MAX_ENTRIES`)
/// 2. TOML config file at `~/.config/winescan/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog configuration.
    pub catalog: CatalogConfig,
    /// History configuration.
    pub history: HistoryConfig,
    /// Scanning configuration.
    pub scan: ScanConfig,
}

/// Catalog-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the JSON catalog.
    pub path: PathBuf,
}

/// History-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/winescan/history.db`
    pub database_path: Option<PathBuf>,
    /// Key the serialized history array is stored under.
    pub storage_key: String,
    /// Maximum number of events to retain.
    /// Set to 0 for unlimited.
    pub max_entries: usize,
}

/// Scanning-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum time between two redraws in milliseconds.
    pub redraw_interval_ms: u64,
    /// Device selected when none is given on the command line.
    pub default_device: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(CATALOG_FILE_NAME),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Resolved at runtime
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_entries: 0,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            redraw_interval_ms: 30,
            default_device: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WINESCAN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.history.storage_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "storage_key must not be empty".to_string(),
            });
        }

        if self.scan.redraw_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "redraw_interval_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.history
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the history cap, `None` when unlimited.
    #[must_use]
    pub fn max_entries(&self) -> Option<usize> {
        match self.history.max_entries {
            0 => None,
            n => Some(n),
        }
    }

    /// Get the redraw interval as a Duration.
    #[must_use]
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.scan.redraw_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.catalog.path, PathBuf::from("wines.json"));
        assert_eq!(config.history.storage_key, "scanHistory");
        assert_eq!(config.history.max_entries, 0);
        assert_eq!(config.scan.redraw_interval_ms, 30);
        assert!(config.scan.default_device.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_storage_key() {
        let mut config = Config::default();
        config.history.storage_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("storage_key"));
    }

    #[test]
    fn test_validate_zero_redraw_interval() {
        let mut config = Config::default();
        config.scan.redraw_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("redraw_interval_ms"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("history.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.history.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_max_entries() {
        let mut config = Config::default();
        assert!(config.max_entries().is_none());

        config.history.max_entries = 50;
        assert_eq!(config.max_entries(), Some(50));
    }

    #[test]
    fn test_redraw_interval() {
        let config = Config::default();
        assert_eq!(config.redraw_interval(), Duration::from_millis(30));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("winescan"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_sections_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [catalog]
                path = "demos/wines.json"

                [history]
                max_entries = 5

                [scan]
                default_device = "codes.txt"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap();
            assert_eq!(config.catalog.path, PathBuf::from("demos/wines.json"));
            assert_eq!(config.max_entries(), Some(5));
            assert_eq!(config.scan.default_device.as_deref(), Some("codes.txt"));
            assert_eq!(config.history.storage_key, "scanHistory");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[history]\nmax_entries = 5\n")?;
            jail.set_env("WINESCAN_HISTORY__MAX_ENTRIES", "9");
            jail.set_env("WINESCAN_CATALOG__PATH", "other.json");

            let config = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap();
            assert_eq!(config.history.max_entries, 9);
            assert_eq!(config.catalog.path, PathBuf::from("other.json"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[scan]\nredraw_interval_ms = 0\n")?;

            let err = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_history_config_deserialize() {
        let json = r#"{"storage_key": "other", "max_entries": 7}"#;
        let history: HistoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(history.storage_key, "other");
        assert_eq!(history.max_entries, 7);
        assert!(history.database_path.is_none());
    }

    #[test]
    fn test_scan_config_serialize() {
        let json = serde_json::to_string(&ScanConfig::default()).unwrap();
        assert!(json.contains("redraw_interval_ms"));
    }
}
