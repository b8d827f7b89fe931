//! Configuration management for mekong-tracker.
//!
//! Configuration is loaded using figment from defaults, an optional TOML
//! file and environment variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::download::DEFAULT_DOWNLOADS_KEY;
use crate::error::{Error, Result};
use crate::feedback::DEFAULT_FEEDBACKS_KEY;
use crate::store::validate_key;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "mekong-tracker";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "tracker.db";

/// Default subdirectory of the data directory for the file backend.
const FILE_STORE_DIR_NAME: &str = "store";

/// Prefix for environment overrides, e.g. `MEKONG_STORAGE__BACKEND=file`.
const ENV_PREFIX: &str = "MEKONG_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MEKONG_`, sections split on `__`)
/// 2. TOML config file at `~/.config/mekong-tracker/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Storage keys for the two documents.
    pub keys: KeysConfig,
    /// Output configuration.
    pub display: DisplayConfig,
}

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `SQLite` database file.
    #[default]
    Sqlite,
    /// Directory of JSON files.
    File,
    /// Process memory; nothing survives exit.
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection.
    pub backend: Backend,
    /// Database file for the `sqlite` backend.
    /// Defaults to `~/.local/share/mekong-tracker/tracker.db`
    pub database_path: Option<PathBuf>,
    /// Directory for the `file` backend.
    /// Defaults to `~/.local/share/mekong-tracker/store`
    pub data_dir: Option<PathBuf>,
    /// Byte quota for the `memory` backend. 0 means unlimited.
    pub quota_bytes: usize,
}

/// Storage key names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Key of the download collection.
    pub downloads: String,
    /// Key of the feedback stats.
    pub feedbacks: String,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Default number of entries for `recent` listings.
    pub recent_limit: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            downloads: DEFAULT_DOWNLOADS_KEY.to_string(),
            feedbacks: DEFAULT_FEEDBACKS_KEY.to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { recent_limit: 10 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

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
        for (name, key) in [
            ("keys.downloads", &self.keys.downloads),
            ("keys.feedbacks", &self.keys.feedbacks),
        ] {
            validate_key(key).map_err(|_| Error::ConfigValidation {
                message: format!(
                    "{name} '{key}' must be non-empty and use only letters, digits, '_', '-' or '.'"
                ),
            })?;
        }

        if self.keys.downloads == self.keys.feedbacks {
            return Err(Error::ConfigValidation {
                message: format!(
                    "keys.downloads and keys.feedbacks must differ (both '{}')",
                    self.keys.downloads
                ),
            });
        }

        if self.display.recent_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "recent_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the file-backend directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(FILE_STORE_DIR_NAME))
    }
}
