//! Application configuration.
//!
//! Values are layered: built-in defaults, then `~/.config/airline/config.json`,
//! then `AIRLINE_*` environment variables.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{FLIGHTS_FILE, RESERVATIONS_FILE};

/// Directory under the user's config and data roots.
pub const APP_DIR: &str = "airline";

/// Config file name inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.json";

const ENV_PREFIX: &str = "AIRLINE";

/// Runtime settings for the booking application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the record files.
    pub data_dir: PathBuf,
    /// Flight record file name, relative to `data_dir`.
    pub flights_file: String,
    /// Reservation record file name, relative to `data_dir`.
    pub reservations_file: String,
    /// Write both record files after every successful booking or cancellation.
    pub persist_on_change: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            flights_file: FLIGHTS_FILE.to_string(),
            reservations_file: RESERVATIONS_FILE.to_string(),
            persist_on_change: true,
        }
    }
}

impl AppConfig {
    /// Location of the user config file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from the user config file and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load from `path` (optional) and the process environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        build(path.as_ref(), None)
    }

    /// Full path of the flight record file.
    pub fn flights_path(&self) -> PathBuf {
        self.data_dir.join(&self.flights_file)
    }

    /// Full path of the reservation record file.
    pub fn reservations_path(&self) -> PathBuf {
        self.data_dir.join(&self.reservations_file)
    }
}

/// Write a config file holding the defaults unless one already exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default config")?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

fn build(path: &Path, env: Option<HashMap<String, String>>) -> Result<AppConfig> {
    let defaults = Config::try_from(&AppConfig::default()).context("failed to encode defaults")?;
    let settings = Config::builder()
        .add_source(defaults)
        .add_source(
            File::from(path.to_path_buf())
                .format(FileFormat::Json)
                .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    settings
        .try_deserialize()
        .context("failed to parse config")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}
