//! Defines all configuration structures for the world clock engine.
//!
//! These structs are deserialized with `serde` from an optional TOML file,
//! layered with `WORLDCLOCK__*` environment variables. Every field has a
//! default, so a missing file still yields a working setup.

use crate::store::DEFAULT_STATE_KEY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The top-level configuration for the `WorldClockEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldClockConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Where the application state document lives.
    pub storage: StorageConfig,

    /// How often clocks are re-rendered.
    pub refresh: RefreshConfig,
}

impl Default for WorldClockConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

/// Which storage backend holds the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost when the process exits.
    Memory,
    /// One JSON file per key under `dir`.
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The key the application state is stored under.
    pub key: String,
    pub backend: StorageBackend,
    /// Directory used by the file backend.
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_STATE_KEY.to_string(),
            backend: StorageBackend::File,
            dir: PathBuf::from(".worldclock"),
        }
    }
}

/// Re-render cadence, chosen by whether seconds are on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub seconds_interval_ms: u64,
    pub minutes_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            seconds_interval_ms: 1_000,
            minutes_interval_ms: 60_000,
        }
    }
}

impl RefreshConfig {
    pub fn interval_for(&self, show_seconds: bool) -> Duration {
        let ms = if show_seconds {
            self.seconds_interval_ms
        } else {
            self.minutes_interval_ms
        };
        // A zero period would make the tokio interval panic.
        Duration::from_millis(ms.max(1))
    }
}

impl WorldClockConfig {
    /// Loads `path` (if given and present) and then `WORLDCLOCK__*` variables.
    ///
    /// Nested keys use a double underscore, e.g. `WORLDCLOCK__STORAGE__KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(
                config::Environment::with_prefix("WORLDCLOCK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
