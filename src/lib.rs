#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};

use alarm::{Alarm, AlarmBook, AlarmDraft};
use config::Config;
use error::{AlarmError, ClockError};
use rotation::{Rotation, SoundCatalog, SoundEntry};
use settings::Settings;
use storage::{Snapshot, Storage};

pub mod alarm;
pub mod alert;
pub mod communication;
pub mod config;
pub mod display;
pub mod error;
pub mod host;
pub mod rotation;
pub mod scheduler;
pub mod settings;
pub mod storage;

/// The alarm clock's data: alarms, settings, and where they are kept.
///
/// Every change is validated and written through to storage before it
/// returns.
pub struct AlarmClock {
    config: Config,
    storage: Box<dyn Storage>,
    catalog: SoundCatalog,
    rotation: Rotation,
    snapshot: Snapshot,
}

impl AlarmClock {
    /// Opens the storage `config` asks for. In-memory sessions start with
    /// the sample alarms, persisted ones start empty.
    ///
    /// # Errors
    /// when the config is invalid or the data directory can't be found
    pub fn open(config: Config, in_memory: bool) -> Result<Self, ClockError> {
        let storage = config.storage(in_memory)?;
        let fallback = if in_memory || !config.persist {
            Snapshot {
                alarms: AlarmBook::sample(),
                settings: Settings::default(),
            }
        } else {
            Snapshot::default()
        };
        Self::with_storage(config, storage, fallback)
    }

    /// # Errors
    /// when the rotation configured in `config` is invalid
    pub fn with_storage(
        config: Config,
        storage: Box<dyn Storage>,
        fallback: Snapshot,
    ) -> Result<Self, ClockError> {
        let catalog = SoundCatalog::default();
        let rotation = config.rotation()?;
        let snapshot = storage::load_or(storage.as_ref(), &catalog, fallback);
        Ok(Self {
            config,
            storage,
            catalog,
            rotation,
            snapshot,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn alarms(&self) -> &AlarmBook {
        &self.snapshot.alarms
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.snapshot.settings
    }

    #[must_use]
    pub const fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    /// a draft filled with the defaults for a new alarm
    #[must_use]
    pub fn new_draft(&self) -> AlarmDraft {
        AlarmDraft::new(&self.snapshot.settings)
    }

    /// Adds an alarm with a fresh id and returns the id.
    ///
    /// # Errors
    /// when the draft is invalid or saving fails
    pub fn add(&mut self, draft: AlarmDraft, now: DateTime<FixedOffset>) -> Result<String, ClockError> {
        let id = self.commit(|snapshot, catalog| {
            let id = snapshot.alarms.fresh_id(now.timestamp_millis());
            snapshot.alarms.add(draft.build(id.clone(), catalog)?)?;
            Ok(id)
        })?;
        info!("added alarm {id}");
        Ok(id)
    }

    /// # Errors
    /// when the id is unknown, the draft is invalid or saving fails
    pub fn replace(&mut self, id: &str, draft: AlarmDraft) -> Result<(), ClockError> {
        self.commit(|snapshot, catalog| {
            snapshot.alarms.replace(id, draft, catalog)?;
            Ok(())
        })?;
        info!("updated alarm {id}");
        Ok(())
    }

    /// # Errors
    /// when the id is unknown, the alarm has no days or saving fails
    pub fn toggle(&mut self, id: &str) -> Result<bool, ClockError> {
        let enabled = self.commit(|snapshot, _| snapshot.alarms.toggle(id))?;
        info!("alarm {id} {}", if enabled { "enabled" } else { "disabled" });
        Ok(enabled)
    }

    /// # Errors
    /// when the id is unknown or saving fails
    pub fn remove(&mut self, id: &str) -> Result<Alarm, ClockError> {
        let removed = self.commit(|snapshot, _| snapshot.alarms.remove(id))?;
        info!("removed alarm {id}");
        Ok(removed)
    }

    /// # Errors
    /// when the settings are invalid or saving fails
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ClockError> {
        self.commit(|snapshot, _| {
            settings.validate()?;
            snapshot.settings = settings;
            Ok(())
        })
    }

    /// Picks up changes other processes saved since this clock was opened.
    ///
    /// Returns the ids of alarms that were edited or removed. Unreadable
    /// stored data is logged and the current alarms are kept.
    pub fn reload(&mut self) -> Vec<String> {
        let snapshot = match self.storage.load(&self.catalog) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("couldn't reload saved alarms, keeping the current ones: {e}");
                return Vec::new();
            }
        };
        if snapshot == self.snapshot {
            return Vec::new();
        }
        let stale = self
            .snapshot
            .alarms
            .iter()
            .filter(|alarm| snapshot.alarms.get(alarm.id()) != Some(*alarm))
            .map(|alarm| alarm.id().to_string())
            .collect();
        debug!("reloaded {} alarms", snapshot.alarms.len());
        self.snapshot = snapshot;
        stale
    }

    /// the sound `alarm` plays if it rings at `instant`
    #[must_use]
    pub fn resolve_sound(&self, alarm: &Alarm, instant: DateTime<Utc>) -> &SoundEntry {
        scheduler::resolve_sound(
            alarm,
            &self.catalog,
            &self.rotation,
            &self.snapshot.settings,
            instant,
        )
    }

    /// Applies `change` to a copy of the data and keeps it only once it is
    /// saved.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Snapshot, &SoundCatalog) -> Result<T, AlarmError>,
    ) -> Result<T, ClockError> {
        let mut next = self.snapshot.clone();
        let out = change(&mut next, &self.catalog)?;
        self.storage.save(&next)?;
        self.snapshot = next;
        Ok(out)
    }
}
