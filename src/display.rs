//! Text rendering of scheduler output for the terminal.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc, Weekday};
use log::warn;

use crate::{
    alarm::{day_tag, Alarm, AlarmTime, Days, SoundChoice},
    rotation::{Rotation, SoundCatalog},
    scheduler::{self, Countdown, TimeUntil},
};

/// The current time in the user's `time_format`. A format chrono can't
/// render falls back to `HH:MM`.
#[must_use]
pub fn format_clock(now: DateTime<FixedOffset>, time_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(time_format)).is_err() {
        warn!("invalid time format {time_format:?}");
        return now.format("%H:%M").to_string();
    }
    out.trim().to_string()
}

/// `7:00 AM`, `12:30 PM`
#[must_use]
pub fn format_time_12h(time: AlarmTime) -> String {
    let (pm, hour) = time.hour12();
    format!("{hour}:{:02} {}", time.minute(), if pm { "PM" } else { "AM" })
}

#[must_use]
pub fn days_summary(days: Days) -> String {
    match days {
        Days::EVERY_DAY => "Every day".to_string(),
        Days::WEEKDAYS => "Weekdays".to_string(),
        Days::WEEKENDS => "Weekends".to_string(),
        Days::NONE => "Never".to_string(),
        days => days
            .iter()
            .map(capitalized_tag)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn capitalized_tag(day: Weekday) -> String {
    let tag = day_tag(day);
    tag[..1].to_ascii_uppercase() + &tag[1..]
}

/// `2d 3h 5m`, `3h 5m` or `5m`
#[must_use]
pub fn format_countdown(countdown: Countdown) -> String {
    match countdown {
        Countdown { days: 0, hours: 0, minutes } => format!("{minutes}m"),
        Countdown { days: 0, hours, minutes } => format!("{hours}h {minutes}m"),
        Countdown { days, hours, minutes } => format!("{days}d {hours}h {minutes}m"),
    }
}

#[must_use]
pub fn format_time_until(until: TimeUntil) -> String {
    match until {
        TimeUntil::Never => "Never".to_string(),
        TimeUntil::In(countdown) => format_countdown(countdown),
    }
}

/// `1d 4h` or `4h`, rotation changes are only shown to the hour
#[must_use]
pub fn format_rotation_countdown(countdown: Countdown) -> String {
    if countdown.days > 0 {
        format!("{}d {}h", countdown.days, countdown.hours)
    } else {
        format!("{}h", countdown.hours)
    }
}

#[must_use]
pub fn sound_name(choice: &SoundChoice, catalog: &SoundCatalog) -> String {
    match choice {
        SoundChoice::Rotating => "Rotating".to_string(),
        SoundChoice::Fixed(file_id) => catalog
            .find(file_id)
            .map_or_else(|| "Unknown Sound".to_string(), |entry| entry.name.clone()),
    }
}

/// one row of the alarm list
#[must_use]
pub fn alarm_row(alarm: &Alarm, catalog: &SoundCatalog, reference: NaiveDateTime) -> String {
    let next = if alarm.enabled() {
        format_time_until(scheduler::time_until(alarm, reference))
    } else {
        "Disabled".to_string()
    };
    format!(
        "{:<22} {:>8}  {:<16} {:<12} {:<16} {}",
        alarm.id(),
        format_time_12h(alarm.time()),
        alarm.label(),
        days_summary(alarm.days()),
        sound_name(alarm.sound(), catalog),
        next
    )
}

/// `Next alarm in 2h 5m (Work Alarm, Mon 07:00)` or `No alarms set`
#[must_use]
pub fn next_alarm_line<'a>(
    alarms: impl IntoIterator<Item = &'a Alarm>,
    reference: NaiveDateTime,
) -> String {
    scheduler::next_alarm(alarms, reference).map_or_else(
        || "No alarms set".to_string(),
        |upcoming| {
            format!(
                "Next alarm in {} ({}, {})",
                format_countdown(Countdown::from_duration(upcoming.at - reference)),
                upcoming.alarm.label(),
                upcoming.at.format("%a %H:%M")
            )
        },
    )
}

/// `Today's sound: Gentle Chimes, changes in 1d 4h`
#[must_use]
pub fn rotation_line(catalog: &SoundCatalog, rotation: &Rotation, instant: DateTime<Utc>) -> String {
    format!(
        "Today's sound: {}, changes in {}",
        rotation.current_sound(catalog, instant).name,
        format_rotation_countdown(Countdown::from_duration(rotation.time_until_next(instant)))
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::alarm::AlarmBook;

    #[test]
    fn clock_uses_configured_format() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 7, 5, 0)
            .unwrap();
        assert_eq!(format_clock(now, "%l:%M %p"), "7:05 AM");
        assert_eq!(format_clock(now, "%H:%M:%S"), "07:05:00");
        assert_eq!(format_clock(now, "%Q"), "07:05");
    }

    #[test]
    fn twelve_hour_times() {
        assert_eq!(format_time_12h(AlarmTime::new(0, 5).unwrap()), "12:05 AM");
        assert_eq!(format_time_12h(AlarmTime::new(7, 0).unwrap()), "7:00 AM");
        assert_eq!(format_time_12h(AlarmTime::new(12, 0).unwrap()), "12:00 PM");
        assert_eq!(format_time_12h(AlarmTime::new(23, 59).unwrap()), "11:59 PM");
    }

    #[test]
    fn day_summaries() {
        assert_eq!(days_summary(Days::EVERY_DAY), "Every day");
        assert_eq!(days_summary(Days::WEEKDAYS), "Weekdays");
        assert_eq!(days_summary(Days::WEEKENDS), "Weekends");
        assert_eq!(days_summary(Days::parse_list("wed,mon").unwrap()), "Mon, Wed");
    }

    #[test]
    fn countdowns() {
        assert_eq!(format_countdown(Countdown::from_minutes(5)), "5m");
        assert_eq!(format_countdown(Countdown::from_minutes(125)), "2h 5m");
        assert_eq!(format_countdown(Countdown::from_minutes(1440 + 60)), "1d 1h 0m");
        assert_eq!(format_time_until(TimeUntil::Never), "Never");
        assert_eq!(format_rotation_countdown(Countdown::from_minutes(1440 + 250)), "1d 4h");
        assert_eq!(format_rotation_countdown(Countdown::from_minutes(250)), "4h");
    }

    #[test]
    fn sound_names() {
        let catalog = SoundCatalog::default();
        assert_eq!(sound_name(&SoundChoice::Rotating, &catalog), "Rotating");
        assert_eq!(
            sound_name(&SoundChoice::Fixed("rooster-call.mp3".to_string()), &catalog),
            "Rooster Call"
        );
    }

    #[test]
    fn list_rows_and_next_line() {
        let catalog = SoundCatalog::default();
        let book = AlarmBook::sample();
        // saturday morning
        let reference = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let work = alarm_row(&book.as_slice()[0], &catalog, reference);
        assert!(work.contains("7:00 AM"));
        assert!(work.contains("Weekdays"));
        assert!(work.ends_with("1d 23h 0m"));
        assert!(alarm_row(&book.as_slice()[1], &catalog, reference).ends_with("Disabled"));
        assert_eq!(
            next_alarm_line(&book, reference),
            "Next alarm in 1d 23h 0m (Work Alarm, Mon 07:00)"
        );
        assert_eq!(next_alarm_line(&AlarmBook::new(), reference), "No alarms set");
    }

    #[test]
    fn rotation_line_names_sound_and_countdown() {
        let catalog = SoundCatalog::default();
        let instant = Utc.timestamp_opt(86_400 * 3, 0).unwrap();
        assert_eq!(
            rotation_line(&catalog, &Rotation::default(), instant),
            "Today's sound: Gentle Chimes, changes in 1d 0h"
        );
    }
}
