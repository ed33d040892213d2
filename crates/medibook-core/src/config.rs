//! Client configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults ([`MedibookConfig::default`])
//! 2. An optional TOML file (`~/.config/medibook/config.toml` by default)
//! 3. Environment overrides of the form `MEDIBOOK__SECTION__KEY`, for example
//!    `MEDIBOOK__API__BASE_URL=https://api.example.lk`
//!
//! Every loaded configuration is validated before use; all field problems are
//! reported together.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "MEDIBOOK";

/// Separator between nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

/// Errors produced while loading, saving, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field failed validation.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// Several fields failed validation.
    #[error("{} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedibookConfig {
    /// Remote booking API settings.
    pub api: ApiConfig,
    /// Manual (by-name) search policy.
    pub search: SearchConfig,
    /// Proximity search parameters.
    pub nearby: NearbyConfig,
    /// Local persistence settings.
    pub storage: StorageConfig,
}

/// Remote booking API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the booking API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.8.193:5001".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Manual search policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries shorter than this (in characters, after trimming) return no results.
    pub min_query_len: usize,
    /// Quiescence window after the last keystroke, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            debounce_ms: 300,
        }
    }
}

impl SearchConfig {
    /// Debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Proximity search parameters passed to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    /// Search radius in kilometers.
    pub radius_km: f64,
    /// Maximum number of doctors returned.
    pub limit: u32,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            radius_km: 20.0,
            limit: 10,
        }
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the data directory (favorites, session).
    pub data_dir: Option<PathBuf>,
}

impl MedibookConfig {
    /// Load configuration from defaults, the default config file, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails validation.
    pub fn load() -> ConfigResult<Self> {
        let path = default_config_path();
        Self::load_from(path.as_deref())
    }

    /// Load configuration using an explicit (optional) config file.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails validation.
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        tracing::debug!(path = ?path, base_url = %loaded.api.base_url, "Configuration loaded");
        Ok(loaded)
    }

    /// Write configuration as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Url::parse(&self.api.base_url) {
            errors.push(invalid("api.base_url", format!("not a valid URL: {e}")));
        }
        if self.api.timeout_secs == 0 {
            errors.push(invalid("api.timeout_secs", "must be greater than zero"));
        }
        if self.search.min_query_len == 0 {
            errors.push(invalid("search.min_query_len", "must be at least 1"));
        }
        if !(self.nearby.radius_km.is_finite() && self.nearby.radius_km > 0.0) {
            errors.push(invalid("nearby.radius_km", "must be a positive number"));
        }
        if self.nearby.limit == 0 {
            errors.push(invalid("nearby.limit", "must be at least 1"));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Directory holding favorites and session files.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(crate::storage::default_data_dir)
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Default configuration file location (`<config dir>/medibook/config.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "medibook")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
