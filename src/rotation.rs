use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

/// A sound that an alarm can play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundEntry {
    pub name: String,
    pub file_id: String,
    pub duration_seconds: u32,
}

impl SoundEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, file_id: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            name: name.into(),
            file_id: file_id.into(),
            duration_seconds,
        }
    }
}

impl fmt::Display for SoundEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}:{:02})",
            self.name,
            self.file_id,
            self.duration_seconds / 60,
            self.duration_seconds % 60
        )
    }
}

/// Ordered, non-empty list of sounds. Positions never change once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCatalog {
    entries: Vec<SoundEntry>,
}

impl SoundCatalog {
    /// # Errors
    /// when `entries` is empty
    pub fn new(entries: Vec<SoundEntry>) -> Result<Self, AlarmError> {
        if entries.is_empty() {
            return Err(AlarmError::EmptyCatalog);
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// always false, a catalog can't be built empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> &SoundEntry {
        &self.entries[0]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SoundEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn find(&self, file_id: &str) -> Option<&SoundEntry> {
        self.entries.iter().find(|entry| entry.file_id == file_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SoundEntry> {
        self.entries.iter()
    }

    /// entry at `index` wrapped around the catalog length
    #[must_use]
    pub fn cycle(&self, index: i64) -> &SoundEntry {
        let len = i64::try_from(self.entries.len()).unwrap_or(i64::MAX);
        // rem_euclid is always in 0..len
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let slot = index.rem_euclid(len) as usize;
        &self.entries[slot]
    }
}

impl Default for SoundCatalog {
    /// the ten built in sounds
    fn default() -> Self {
        Self {
            entries: vec![
                SoundEntry::new("Classic Beep", "classic-beep.mp3", 5),
                SoundEntry::new("Gentle Chimes", "gentle-chimes.mp3", 8),
                SoundEntry::new("Digital Bell", "digital-bell.mp3", 6),
                SoundEntry::new("Morning Birds", "morning-birds.mp3", 12),
                SoundEntry::new("Soft Piano", "soft-piano.mp3", 10),
                SoundEntry::new("Ocean Waves", "ocean-waves.mp3", 15),
                SoundEntry::new("Forest Dawn", "forest-dawn.mp3", 14),
                SoundEntry::new("Electronic Pulse", "electronic-pulse.mp3", 7),
                SoundEntry::new("Zen Bell", "zen-bell.mp3", 9),
                SoundEntry::new("Rooster Call", "rooster-call.mp3", 11),
            ],
        }
    }
}

impl<'a> IntoIterator for &'a SoundCatalog {
    type Item = &'a SoundEntry;
    type IntoIter = std::slice::Iter<'a, SoundEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Deterministic sound rotation.
///
/// Time since `epoch` is cut into fixed periods; period `n` plays
/// `catalog[n mod len]`. Nothing is stored, so every process reading the same
/// clock agrees on the active sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    period: Duration,
    epoch: DateTime<Utc>,
}

impl Default for Rotation {
    /// two day periods counted from the unix epoch
    fn default() -> Self {
        Self {
            period: Duration::days(2),
            epoch: DateTime::<Utc>::default(),
        }
    }
}

impl Rotation {
    /// # Errors
    /// when `period` is shorter than a millisecond
    pub fn new(period: Duration, epoch: DateTime<Utc>) -> Result<Self, AlarmError> {
        // periods are counted in whole milliseconds
        if period.num_milliseconds() < 1 {
            return Err(AlarmError::InvalidRotationPeriod);
        }
        Ok(Self { period, epoch })
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub const fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// number of whole periods between the epoch and `instant`, floored
    #[must_use]
    pub fn index_at(&self, instant: DateTime<Utc>) -> i64 {
        let elapsed = (instant - self.epoch).num_milliseconds();
        elapsed.div_euclid(self.period.num_milliseconds())
    }

    /// the sound the rotation selects at `instant`
    #[must_use]
    pub fn current_sound<'a>(&self, catalog: &'a SoundCatalog, instant: DateTime<Utc>) -> &'a SoundEntry {
        catalog.cycle(self.index_at(instant))
    }

    /// start of the period after the one containing `instant`
    #[must_use]
    pub fn next_boundary(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let periods = self.index_at(instant) + 1;
        self.epoch + Duration::milliseconds(periods * self.period.num_milliseconds())
    }

    /// how long until the rotation moves on to the next sound
    #[must_use]
    pub fn time_until_next(&self, instant: DateTime<Utc>) -> Duration {
        self.next_boundary(instant) - instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_secs(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn catalog_cannot_be_empty() {
        assert_eq!(SoundCatalog::new(vec![]), Err(AlarmError::EmptyCatalog));
        let single = SoundCatalog::new(vec![SoundEntry::new("Only", "only.mp3", 3)]).unwrap();
        assert_eq!(single.cycle(-7).name, "Only");
    }

    #[test]
    fn default_catalog_is_index_stable() {
        let catalog = SoundCatalog::default();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.first().file_id, "classic-beep.mp3");
        assert_eq!(catalog.get(9).unwrap().name, "Rooster Call");
        assert_eq!(catalog.find("zen-bell.mp3").unwrap().duration_seconds, 9);
        assert!(catalog.find("rotating").is_none());
    }

    #[test]
    fn three_days_after_epoch_is_second_period() {
        let catalog = SoundCatalog::default();
        let rotation = Rotation::default();
        let instant = at_secs(86_400 * 3);
        assert_eq!(rotation.index_at(instant), 1);
        assert_eq!(rotation.current_sound(&catalog, instant), catalog.get(1).unwrap());
    }

    #[test]
    fn sound_is_constant_within_a_period() {
        let catalog = SoundCatalog::default();
        let rotation = Rotation::default();
        let start = at_secs(86_400 * 20);
        let end = at_secs(86_400 * 22 - 1);
        assert_eq!(
            rotation.current_sound(&catalog, start),
            rotation.current_sound(&catalog, end)
        );
    }

    #[test]
    fn adjacent_periods_advance_by_one_and_wrap() {
        let catalog = SoundCatalog::default();
        let rotation = Rotation::default();
        for period in 0..25_i64 {
            let here = at_secs(period * 2 * 86_400 + 3_600);
            let next = at_secs((period + 1) * 2 * 86_400 + 3_600);
            let here_index = rotation.index_at(here);
            assert_eq!(rotation.index_at(next), here_index + 1);
            assert_eq!(rotation.current_sound(&catalog, next), catalog.cycle(here_index + 1));
        }
        assert_eq!(catalog.cycle(10), catalog.first());
    }

    #[test]
    fn instants_before_epoch_floor_downwards() {
        let catalog = SoundCatalog::default();
        let rotation = Rotation::new(Duration::days(2), at_secs(86_400 * 10)).unwrap();
        assert_eq!(rotation.index_at(at_secs(86_400 * 10 - 1)), -1);
        assert_eq!(
            rotation.current_sound(&catalog, at_secs(86_400 * 10 - 1)),
            catalog.get(9).unwrap()
        );
    }

    #[test]
    fn time_until_next_rotation() {
        let rotation = Rotation::default();
        // 1.5 days into the first period
        let instant = at_secs(86_400 + 43_200);
        assert_eq!(rotation.time_until_next(instant), Duration::hours(12));
        // exactly on a boundary the whole next period remains
        assert_eq!(rotation.time_until_next(at_secs(86_400 * 2)), Duration::days(2));
    }

    #[test]
    fn rejects_non_positive_period() {
        let epoch = DateTime::<Utc>::default();
        for period in [
            Duration::zero(),
            Duration::days(-2),
            Duration::microseconds(500),
        ] {
            assert_eq!(
                Rotation::new(period, epoch),
                Err(AlarmError::InvalidRotationPeriod),
                "{period}"
            );
        }
        let shortest = Rotation::new(Duration::milliseconds(1), epoch).unwrap();
        assert_eq!(shortest.index_at(at_secs(10)), 10_000);
    }
}
