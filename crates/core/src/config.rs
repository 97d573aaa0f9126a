//! Layered application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::mission::EngineSettings;

/// Directory under the platform config dir holding `config.json`.
pub const CONFIG_DIR: &str = "nexus";
/// Prefix of environment overrides, e.g. `NEXUS__TICK_INTERVAL_MS`.
pub const ENV_PREFIX: &str = "NEXUS";

/// Runtime settings for the engine, sessions and timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine tunables.
    pub engine: EngineSettings,
    /// Minutes a session stays valid after it is opened.
    pub session_ttl_minutes: u64,
    /// Period of the mission timer.
    pub tick_interval_ms: u64,
    /// Most recent mission instances kept by [`MissionService::cleanup`].
    ///
    /// [`MissionService::cleanup`]: crate::service::MissionService::cleanup
    pub mission_retention: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            session_ttl_minutes: 120,
            tick_interval_ms: 1000,
            mission_retention: 1000,
        }
    }
}

impl AppConfig {
    /// Load defaults, the user config file and `NEXUS__*` overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load with an explicit config file location. A missing file is skipped.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("failed to encode default config")?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        settings
            .try_deserialize()
            .context("invalid configuration values")
    }
}

/// Location of the user config file.
pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no platform config directory")?;
    Ok(base.join(CONFIG_DIR).join("config.json"))
}

/// Write the default config file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path()?;
    ensure_default_config_at(&path)?;
    Ok(path)
}

/// Write the default config to `path` unless a file is already there.
pub fn ensure_default_config_at(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(&AppConfig::default())?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default config");
    Ok(true)
}
