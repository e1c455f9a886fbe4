//! Persistence port for alarms and settings.
//!
//! Both are stored as JSON text under two keys of a key/value store. The
//! in-memory mode uses [`NoopStorage`], which never reads or writes anything.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::{alarm::AlarmBook, error::StorageError, rotation::SoundCatalog, settings::Settings};

pub const ALARMS_KEY: &str = "alarmClockAlarms";
pub const SETTINGS_KEY: &str = "alarmClockSettings";

/// Everything that gets persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub alarms: AlarmBook,
    pub settings: Settings,
}

/// Where alarms and settings live between runs.
pub trait Storage {
    /// `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    /// when the store can't be read or holds invalid data
    fn load(&self, catalog: &SoundCatalog) -> Result<Option<Snapshot>, StorageError>;

    /// # Errors
    /// when the store can't be written
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError>;
}

/// Keeps nothing; every session starts from its fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl Storage for NoopStorage {
    fn load(&self, _catalog: &SoundCatalog) -> Result<Option<Snapshot>, StorageError> {
        Ok(None)
    }

    fn save(&mut self, _snapshot: &Snapshot) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A flat string to string store.
pub trait KeyValueStore {
    /// # Errors
    /// when the backing store can't be read
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// when the backing store can't be written
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(key);
        // write then rename so a crash never leaves half a file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }
}

/// Stores the snapshot as JSON under [`ALARMS_KEY`] and [`SETTINGS_KEY`].
#[derive(Debug, Clone, Default)]
pub struct KeyValueStorage<S> {
    store: S,
}

impl<S: KeyValueStore> KeyValueStorage<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.store
            .get(key)?
            .map(|text| {
                serde_json::from_str(&text).map_err(|source| StorageError::CorruptPersistedData {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, text)
    }
}

impl<S: KeyValueStore> Storage for KeyValueStorage<S> {
    fn load(&self, catalog: &SoundCatalog) -> Result<Option<Snapshot>, StorageError> {
        let alarms: Option<AlarmBook> = self.read(ALARMS_KEY)?;
        let settings: Option<Settings> = self.read(SETTINGS_KEY)?;
        if alarms.is_none() && settings.is_none() {
            return Ok(None);
        }
        let alarms = alarms.unwrap_or_default();
        alarms
            .validate(catalog)
            .map_err(|source| StorageError::InvalidPersistedAlarm {
                key: ALARMS_KEY.to_string(),
                source,
            })?;
        Ok(Some(Snapshot {
            alarms,
            settings: settings.unwrap_or_default(),
        }))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        self.write(ALARMS_KEY, &snapshot.alarms)?;
        self.write(SETTINGS_KEY, &snapshot.settings)?;
        debug!("saved {} alarms", snapshot.alarms.len());
        Ok(())
    }
}

/// Loads the stored snapshot, or `fallback` when nothing is stored or the
/// stored data can't be used. Bad data is logged and never fatal.
pub fn load_or(storage: &dyn Storage, catalog: &SoundCatalog, fallback: Snapshot) -> Snapshot {
    match storage.load(catalog) {
        Ok(Some(snapshot)) => {
            info!("loaded {} alarms", snapshot.alarms.len());
            snapshot
        }
        Ok(None) => fallback,
        Err(e) => {
            warn!("couldn't load saved alarms, starting from defaults: {e}");
            fallback
        }
    }
}
