use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    rotation::Rotation,
    storage::{FileStore, KeyValueStorage, NoopStorage, Storage},
};

const APP_NAME: &str = "rotating_alarm";

/// Host configuration, read from `config.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// chrono format string for the current time
    pub time_format: String,
    /// save alarms and settings to disk; off keeps them in memory only
    pub persist: bool,
    /// seconds between alarm checks, clamped to 1..=30
    pub tick_interval_secs: u64,
    pub rotation_period_days: u32,
    /// start of the first rotation period, in UTC
    #[serde(with = "toml_datetime_compat")]
    pub rotation_epoch: NaiveDateTime,
    /// where alarms are stored, defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%l:%M %p".to_string(),
            persist: true,
            tick_interval_secs: 1,
            rotation_period_days: 2,
            rotation_epoch: NaiveDateTime::default(),
            data_dir: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the config at `path`; a missing file gives the defaults.
    ///
    /// # Errors
    /// when the file exists but can't be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(config) => config,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&config).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    /// when the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, config).map_err(io_err)
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", APP_NAME)
    }

    /// # Errors
    /// when the platform has no config directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::project_dirs()
            .ok_or(ConfigError::NoProjectDir("config"))?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// # Errors
    /// when no `data_dir` is set and the platform has no data directory
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()
                .ok_or(ConfigError::NoProjectDir("data"))?
                .data_dir()
                .to_path_buf()),
        }
    }

    /// # Errors
    /// when the rotation period is zero
    pub fn rotation(&self) -> Result<Rotation, ConfigError> {
        let epoch = DateTime::<Utc>::from_naive_utc_and_offset(self.rotation_epoch, Utc);
        let period = chrono::Duration::days(i64::from(self.rotation_period_days));
        Ok(Rotation::new(period, epoch)?)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.clamp(1, 30))
    }

    /// The storage the config asks for; `in_memory` overrides `persist`.
    ///
    /// # Errors
    /// when persisting and the data directory can't be determined
    pub fn storage(&self, in_memory: bool) -> Result<Box<dyn Storage>, ConfigError> {
        if in_memory || !self.persist {
            return Ok(Box::new(NoopStorage));
        }
        Ok(Box::new(KeyValueStorage::new(FileStore::new(self.data_dir()?))))
    }
}
