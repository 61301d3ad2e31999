use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::process_monitor::{FilterInputs, SortKey};
use crate::error::{ProcwatchError, Result};

const MIN_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling interval for newly started monitoring sessions
    pub sampling_interval_ms: u64,
    /// Interval between automatic list refreshes
    pub refresh_interval_ms: u64,
    pub auto_refresh: bool,
    pub sort: SortKey,
    /// Filter applied when the list is first shown
    pub filter: FilterInputs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 1000,
            refresh_interval_ms: 2000,
            auto_refresh: false,
            sort: SortKey::Name,
            filter: FilterInputs::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Read a config file. Missing, empty or unreadable content yields the
    /// defaults (the format may have changed between versions).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read(path)?;
        if data.is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ProcwatchError::config("Could not determine config directory"))?;

        Ok(config_dir.join("procwatch").join("config.json"))
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(MIN_INTERVAL_MS))
    }
}
