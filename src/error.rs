use std::path::PathBuf;

use thiserror::Error;

/// Validation errors for alarm records and the sound catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlarmError {
    #[error("invalid alarm time {hour:02}:{minute:02}")]
    InvalidAlarmTime { hour: u32, minute: u32 },
    #[error("couldn't parse alarm time {0:?}, expected HH:MM")]
    MalformedTime(String),
    #[error("alarm has no days selected")]
    EmptyDaySet,
    #[error("unknown day {0:?}")]
    UnknownDay(String),
    #[error("volume {0} is outside 0.0..=1.0")]
    InvalidVolume(String),
    #[error("snooze must be at least one minute")]
    InvalidSnooze,
    #[error("unknown sound {0:?}")]
    UnknownSound(String),
    #[error("sound catalog is empty")]
    EmptyCatalog,
    #[error("rotation period must be at least one millisecond")]
    InvalidRotationPeriod,
    #[error("an alarm with id {0:?} already exists")]
    DuplicateId(String),
    #[error("no alarm with id {0:?}")]
    NotFound(String),
}

/// Errors from the persistence port.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("couldn't access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value under {key:?} is corrupt: {source}")]
    CorruptPersistedData {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored alarms under {key:?} are invalid: {source}")]
    InvalidPersistedAlarm {
        key: String,
        #[source]
        source: AlarmError,
    },
    #[error("couldn't serialize {key:?}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors reading or writing the host configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't determine the {0} directory")]
    NoProjectDir(&'static str),
    #[error("couldn't access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Rotation(#[from] AlarmError),
}

/// Errors from changing alarms or settings through [`crate::AlarmClock`].
#[derive(Debug, Error)]
pub enum ClockError {
    #[error(transparent)]
    Alarm(#[from] AlarmError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
