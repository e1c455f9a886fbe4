//! Pure scheduling over alarm records.
//!
//! Every function takes the reference instant as a local wall clock reading
//! supplied by the caller and holds no state of its own, so the same inputs
//! always give the same answer.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc};

use crate::{
    alarm::{Alarm, SoundChoice},
    rotation::{Rotation, SoundCatalog, SoundEntry},
    settings::Settings,
};

/// The earliest instant after `reference` at which `alarm` rings.
///
/// An alarm whose time is exactly `reference` counts as already passed and
/// is scheduled a week later. `None` when the alarm has no days. The
/// `enabled` flag is not consulted here.
#[must_use]
pub fn next_occurrence(alarm: &Alarm, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = reference.weekday().num_days_from_sunday();
    let alarm_time = alarm.time().as_naive();
    let passed_today = alarm_time <= reference.time();
    alarm
        .days()
        .iter()
        .map(|day| {
            let days_until = match (day.num_days_from_sunday() + 7 - today) % 7 {
                0 if passed_today => 7,
                n => n,
            };
            (reference.date() + Duration::days(i64::from(days_until))).and_time(alarm_time)
        })
        .min()
}

/// An enabled alarm together with the instant it rings next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upcoming<'a> {
    pub alarm: &'a Alarm,
    pub at: NaiveDateTime,
}

/// The enabled alarm that rings first after `reference`.
///
/// When several alarms ring at the same instant the one earliest in
/// `alarms` wins.
pub fn next_alarm<'a>(
    alarms: impl IntoIterator<Item = &'a Alarm>,
    reference: NaiveDateTime,
) -> Option<Upcoming<'a>> {
    alarms
        .into_iter()
        .filter(|alarm| alarm.enabled())
        .filter_map(|alarm| next_occurrence(alarm, reference).map(|at| Upcoming { alarm, at }))
        .fold(None, |best: Option<Upcoming<'a>>, candidate| match best {
            Some(best) if best.at <= candidate.at => Some(best),
            _ => Some(candidate),
        })
}

/// Whole minutes split into days, hours and minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl Countdown {
    #[must_use]
    pub const fn from_minutes(total: i64) -> Self {
        Self {
            days: total / (24 * 60),
            hours: total % (24 * 60) / 60,
            minutes: total % 60,
        }
    }

    /// floors to whole minutes; negative durations count as zero
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        Self::from_minutes(duration.num_minutes().max(0))
    }

    #[must_use]
    pub const fn total_minutes(&self) -> i64 {
        (self.days * 24 + self.hours) * 60 + self.minutes
    }
}

/// How long until an alarm rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUntil {
    Never,
    In(Countdown),
}

/// Time from `reference` to the alarm's next occurrence in whole minutes.
#[must_use]
pub fn time_until(alarm: &Alarm, reference: NaiveDateTime) -> TimeUntil {
    next_occurrence(alarm, reference).map_or(TimeUntil::Never, |at| {
        TimeUntil::In(Countdown::from_duration(at - reference))
    })
}

/// True for the whole minute an enabled alarm is set to ring in.
///
/// This is level triggered: it stays true for up to sixty seconds, so a
/// poller must remember what it already fired (see [`crate::host::TriggerGuard`]).
#[must_use]
pub fn should_trigger(alarm: &Alarm, reference: NaiveDateTime) -> bool {
    alarm.enabled()
        && alarm.days().contains(reference.weekday())
        && alarm.time().hour() == reference.hour()
        && alarm.time().minute() == reference.minute()
}

/// The sound that `alarm` plays when it rings at `instant`.
///
/// Rotating alarms follow the rotation, or stay on the first catalog entry
/// when rotation is switched off. Fixed sounds are looked up by file id,
/// which validation guarantees to exist; a stale id falls back to the
/// rotation.
#[must_use]
pub fn resolve_sound<'a>(
    alarm: &Alarm,
    catalog: &'a SoundCatalog,
    rotation: &Rotation,
    settings: &Settings,
    instant: DateTime<Utc>,
) -> &'a SoundEntry {
    let rotating = || {
        if settings.enable_rotation {
            rotation.current_sound(catalog, instant)
        } else {
            catalog.first()
        }
    };
    match alarm.sound() {
        SoundChoice::Rotating => rotating(),
        SoundChoice::Fixed(file_id) => catalog.find(file_id).unwrap_or_else(|| {
            log::warn!("alarm {} has unknown sound {file_id}", alarm.id());
            rotating()
        }),
    }
}
