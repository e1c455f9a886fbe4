use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{error::AlarmError, rotation::SoundCatalog, settings::Settings};

/// label used when the user leaves the label empty
pub const DEFAULT_LABEL: &str = "Alarm";

/// token stored in place of a sound id for alarms that follow the rotation
pub const ROTATING: &str = "rotating";

/// weekday tags in day-index order (sunday is 0)
const DAY_TAGS: [(&str, Weekday); 7] = [
    ("sun", Weekday::Sun),
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
];

/// A wall clock time of day with minute granularity.
///
/// Always holds a valid hour and minute; it is persisted as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    const SEVEN_AM: Self = Self { hour: 7, minute: 0 };

    /// # Errors
    /// when the hour is not in `0..24` or the minute is not in `0..60`
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(hour: u32, minute: u32) -> Result<Self, AlarmError> {
        if hour > 23 || minute > 59 {
            return Err(AlarmError::InvalidAlarmTime { hour, minute });
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    #[must_use]
    pub const fn hour(self) -> u32 {
        self.hour as u32
    }

    #[must_use]
    pub const fn minute(self) -> u32 {
        self.minute as u32
    }

    #[must_use]
    pub const fn minutes_from_midnight(self) -> u32 {
        self.hour() * 60 + self.minute()
    }

    /// the time of day with seconds zeroed
    #[must_use]
    pub fn as_naive(self) -> NaiveTime {
        NaiveTime::MIN + Duration::minutes(i64::from(self.minutes_from_midnight()))
    }

    /// hour on a 12 hour clock and whether it is past noon
    #[must_use]
    pub const fn hour12(self) -> (bool, u32) {
        let pm = self.hour >= 12;
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        (pm, hour as u32)
    }
}

impl Default for AlarmTime {
    fn default() -> Self {
        Self::SEVEN_AM
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// accepts `HH:MM` on a 24 hour clock or `H:MM AM`/`H:MM PM`
impl FromStr for AlarmTime {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AlarmError::MalformedTime(s.to_string());
        let upper = s.trim().to_ascii_uppercase();
        let (clock, pm) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };
        let (hour, minute) = clock.split_once(':').ok_or_else(malformed)?;
        let hour: u32 = hour.trim().parse().map_err(|_| malformed())?;
        let minute: u32 = minute.trim().parse().map_err(|_| malformed())?;
        let hour = match pm {
            None => hour,
            Some(_) if !(1..=12).contains(&hour) => {
                return Err(AlarmError::InvalidAlarmTime { hour, minute })
            }
            Some(pm) => hour % 12 + if pm { 12 } else { 0 },
        };
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = AlarmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(time: AlarmTime) -> Self {
        time.to_string()
    }
}

/// tag of a weekday as stored (`"mon"`, `"tue"`, ...)
#[must_use]
pub fn day_tag(day: Weekday) -> &'static str {
    DAY_TAGS[day.num_days_from_sunday() as usize].0
}

/// # Errors
/// when the tag is not one of the seven weekday tags
pub fn parse_day(tag: &str) -> Result<Weekday, AlarmError> {
    let lower = tag.trim().to_ascii_lowercase();
    DAY_TAGS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, day)| *day)
        .ok_or_else(|| AlarmError::UnknownDay(tag.to_string()))
}

/// The set of weekdays an alarm rings on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Days(u8);

impl Days {
    pub const NONE: Self = Self(0);
    pub const WEEKDAYS: Self = Self(0b011_1110);
    pub const WEEKENDS: Self = Self(0b100_0001);
    pub const EVERY_DAY: Self = Self(0b111_1111);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// days in day-index order, sunday first
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        DAY_TAGS
            .iter()
            .map(|(_, day)| *day)
            .filter(move |day| self.contains(*day))
    }

    /// Parses `everyday`, `weekdays`, `weekends` or a comma separated list of
    /// day tags such as `mon,wed,fri`.
    ///
    /// # Errors
    /// when a listed day is unknown or nothing is listed
    pub fn parse_list(pattern: &str) -> Result<Self, AlarmError> {
        match pattern.trim().to_ascii_lowercase().as_str() {
            "everyday" | "every day" | "daily" => Ok(Self::EVERY_DAY),
            "weekdays" => Ok(Self::WEEKDAYS),
            "weekends" => Ok(Self::WEEKENDS),
            list => {
                let days = list
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(parse_day)
                    .collect::<Result<Self, _>>()?;
                if days.is_empty() {
                    return Err(AlarmError::EmptyDaySet);
                }
                Ok(days)
            }
        }
    }
}

impl FromIterator<Weekday> for Days {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut days = Self::NONE;
        iter.into_iter().for_each(|day| days.insert(day));
        days
    }
}

impl TryFrom<Vec<String>> for Days {
    type Error = AlarmError;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        tags.iter().map(|tag| parse_day(tag)).collect()
    }
}

impl From<Days> for Vec<String> {
    fn from(days: Days) -> Self {
        days.iter().map(|day| day_tag(day).to_string()).collect()
    }
}

/// Which sound an alarm plays.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SoundChoice {
    /// whatever the rotation currently selects
    #[default]
    Rotating,
    /// a file id from the sound catalog
    Fixed(String),
}

impl From<String> for SoundChoice {
    fn from(value: String) -> Self {
        if value == ROTATING {
            Self::Rotating
        } else {
            Self::Fixed(value)
        }
    }
}

impl From<SoundChoice> for String {
    fn from(choice: SoundChoice) -> Self {
        match choice {
            SoundChoice::Rotating => ROTATING.to_string(),
            SoundChoice::Fixed(file_id) => file_id,
        }
    }
}

impl FromStr for SoundChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.trim().to_string()))
    }
}

/// A validated alarm.
///
/// Fields are only changed by replacing the whole record through [`AlarmBook`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    id: String,
    time: AlarmTime,
    days: Days,
    label: String,
    sound: SoundChoice,
    volume: f64,
    #[serde(rename = "snooze")]
    snooze_minutes: u32,
    enabled: bool,
}

impl Alarm {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn time(&self) -> AlarmTime {
        self.time
    }

    #[must_use]
    pub const fn days(&self) -> Days {
        self.days
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn sound(&self) -> &SoundChoice {
        &self.sound
    }

    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.volume
    }

    #[must_use]
    pub const fn snooze_minutes(&self) -> u32 {
        self.snooze_minutes
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Checks every field invariant, including that a fixed sound exists in the catalog.
    ///
    /// # Errors
    /// the first violated invariant
    pub fn validate(&self, catalog: &SoundCatalog) -> Result<(), AlarmError> {
        if self.enabled && self.days.is_empty() {
            return Err(AlarmError::EmptyDaySet);
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(AlarmError::InvalidVolume(self.volume.to_string()));
        }
        if self.snooze_minutes == 0 {
            return Err(AlarmError::InvalidSnooze);
        }
        if let SoundChoice::Fixed(file_id) = &self.sound {
            if catalog.find(file_id).is_none() {
                return Err(AlarmError::UnknownSound(file_id.clone()));
            }
        }
        Ok(())
    }
}

/// Editable, not yet validated alarm fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDraft {
    pub time: AlarmTime,
    pub days: Days,
    pub label: String,
    pub sound: SoundChoice,
    pub volume: f64,
    pub snooze_minutes: u32,
    pub enabled: bool,
}

impl AlarmDraft {
    /// a new alarm: 7:00 AM on weekdays with the rotating sound
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            time: AlarmTime::default(),
            days: Days::WEEKDAYS,
            label: String::new(),
            sound: SoundChoice::Rotating,
            volume: settings.default_volume,
            snooze_minutes: settings.default_snooze,
            enabled: true,
        }
    }

    /// # Errors
    /// when any field is invalid
    pub fn build(self, id: impl Into<String>, catalog: &SoundCatalog) -> Result<Alarm, AlarmError> {
        let label = self.label.trim();
        let alarm = Alarm {
            id: id.into(),
            time: self.time,
            days: self.days,
            label: if label.is_empty() {
                DEFAULT_LABEL.to_string()
            } else {
                label.to_string()
            },
            sound: self.sound,
            volume: self.volume,
            snooze_minutes: self.snooze_minutes,
            enabled: self.enabled,
        };
        alarm.validate(catalog)?;
        Ok(alarm)
    }
}

impl From<&Alarm> for AlarmDraft {
    fn from(alarm: &Alarm) -> Self {
        Self {
            time: alarm.time,
            days: alarm.days,
            label: alarm.label.clone(),
            sound: alarm.sound.clone(),
            volume: alarm.volume,
            snooze_minutes: alarm.snooze_minutes,
            enabled: alarm.enabled,
        }
    }
}

/// Ordered collection of alarms with unique ids.
///
/// Insertion order is kept through persistence and decides ties between
/// alarms that fire at the same instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Alarm>", into = "Vec<Alarm>")]
pub struct AlarmBook {
    alarms: Vec<Alarm>,
}

impl AlarmBook {
    #[must_use]
    pub const fn new() -> Self {
        Self { alarms: Vec::new() }
    }

    /// the alarms an in-memory session starts with
    #[must_use]
    pub fn sample() -> Self {
        let weekend = AlarmTime { hour: 9, minute: 0 };
        Self {
            alarms: vec![
                Alarm {
                    id: "alarm1".to_string(),
                    time: AlarmTime::SEVEN_AM,
                    days: Days::WEEKDAYS,
                    label: "Work Alarm".to_string(),
                    sound: SoundChoice::Rotating,
                    volume: 0.8,
                    snooze_minutes: 5,
                    enabled: true,
                },
                Alarm {
                    id: "alarm2".to_string(),
                    time: weekend,
                    days: Days::WEEKENDS,
                    label: "Weekend Wake-up".to_string(),
                    sound: SoundChoice::Rotating,
                    volume: 0.6,
                    snooze_minutes: 10,
                    enabled: false,
                },
            ],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Alarm> {
        self.alarms.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    fn position(&self, id: &str) -> Result<usize, AlarmError> {
        self.alarms
            .iter()
            .position(|alarm| alarm.id == id)
            .ok_or_else(|| AlarmError::NotFound(id.to_string()))
    }

    /// An id of the form `alarm_<millis>` not used by any alarm in the book.
    #[must_use]
    pub fn fresh_id(&self, epoch_millis: i64) -> String {
        let mut millis = epoch_millis;
        loop {
            let id = format!("alarm_{millis}");
            if self.get(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    /// appends an alarm to the end of the book
    ///
    /// # Errors
    /// when the id is already taken
    pub fn add(&mut self, alarm: Alarm) -> Result<&Alarm, AlarmError> {
        if self.get(&alarm.id).is_some() {
            return Err(AlarmError::DuplicateId(alarm.id));
        }
        self.alarms.push(alarm);
        Ok(&self.alarms[self.alarms.len() - 1])
    }

    /// replaces an alarm in place, keeping its id and position
    ///
    /// # Errors
    /// when the id is unknown or the draft is invalid
    pub fn replace(
        &mut self,
        id: &str,
        draft: AlarmDraft,
        catalog: &SoundCatalog,
    ) -> Result<&Alarm, AlarmError> {
        let index = self.position(id)?;
        self.alarms[index] = draft.build(id, catalog)?;
        Ok(&self.alarms[index])
    }

    /// flips `enabled`, returning the new value
    ///
    /// # Errors
    /// when the id is unknown or the alarm would be enabled without days
    pub fn toggle(&mut self, id: &str) -> Result<bool, AlarmError> {
        let index = self.position(id)?;
        let alarm = &mut self.alarms[index];
        if !alarm.enabled && alarm.days.is_empty() {
            return Err(AlarmError::EmptyDaySet);
        }
        alarm.enabled = !alarm.enabled;
        Ok(alarm.enabled)
    }

    /// # Errors
    /// when the id is unknown
    pub fn remove(&mut self, id: &str) -> Result<Alarm, AlarmError> {
        let index = self.position(id)?;
        Ok(self.alarms.remove(index))
    }

    /// # Errors
    /// the first alarm that fails [`Alarm::validate`]
    pub fn validate(&self, catalog: &SoundCatalog) -> Result<(), AlarmError> {
        self.alarms.iter().try_for_each(|alarm| alarm.validate(catalog))
    }
}

impl TryFrom<Vec<Alarm>> for AlarmBook {
    type Error = AlarmError;

    fn try_from(alarms: Vec<Alarm>) -> Result<Self, Self::Error> {
        let mut book = Self::new();
        for alarm in alarms {
            book.add(alarm)?;
        }
        Ok(book)
    }
}

impl From<AlarmBook> for Vec<Alarm> {
    fn from(book: AlarmBook) -> Self {
        book.alarms
    }
}

impl<'a> IntoIterator for &'a AlarmBook {
    type Item = &'a Alarm;
    type IntoIter = std::slice::Iter<'a, Alarm>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn draft() -> AlarmDraft {
        AlarmDraft::new(&Settings::default())
    }

    #[test_case("07:00", 7, 0; "twenty_four_hour")]
    #[test_case("23:59", 23, 59; "last_minute")]
    #[test_case("7:05 am", 7, 5; "morning")]
    #[test_case("12:00 AM", 0, 0; "midnight")]
    #[test_case("12:30 PM", 12, 30; "noon")]
    #[test_case("9:15PM", 21, 15; "evening_without_space")]
    fn parses_alarm_time(input: &str, hour: u32, minute: u32) {
        let time: AlarmTime = input.parse().unwrap();
        assert_eq!((time.hour(), time.minute()), (hour, minute));
    }

    #[test_case("24:00"; "hour_out_of_range")]
    #[test_case("10:60"; "minute_out_of_range")]
    #[test_case("13:00 PM"; "twelve_hour_out_of_range")]
    #[test_case("0:10 AM"; "zero_on_twelve_hour_clock")]
    fn rejects_out_of_range_time(input: &str) {
        assert!(matches!(
            input.parse::<AlarmTime>(),
            Err(AlarmError::InvalidAlarmTime { .. })
        ));
    }

    #[test]
    fn rejects_malformed_time() {
        assert_eq!(
            "seven".parse::<AlarmTime>(),
            Err(AlarmError::MalformedTime("seven".to_string()))
        );
    }

    #[test]
    fn hour12_matches_wall_clock() {
        assert_eq!(AlarmTime::new(0, 0).unwrap().hour12(), (false, 12));
        assert_eq!(AlarmTime::new(12, 0).unwrap().hour12(), (true, 12));
        assert_eq!(AlarmTime::new(19, 0).unwrap().hour12(), (true, 7));
    }

    #[test]
    fn parses_day_patterns() {
        assert_eq!(Days::parse_list("weekdays").unwrap(), Days::WEEKDAYS);
        assert_eq!(Days::parse_list("Weekends").unwrap(), Days::WEEKENDS);
        assert_eq!(Days::parse_list("everyday").unwrap(), Days::EVERY_DAY);
        let days = Days::parse_list("fri, mon,mon").unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![Weekday::Mon, Weekday::Fri]);
        assert_eq!(Days::parse_list("mon,funday"), Err(AlarmError::UnknownDay("funday".to_string())));
        assert_eq!(Days::parse_list(" , "), Err(AlarmError::EmptyDaySet));
    }

    #[test]
    fn days_serialize_as_tags_sunday_first() {
        let days: Days = [Weekday::Sat, Weekday::Sun, Weekday::Wed].into_iter().collect();
        let json = serde_json::to_string(&days).unwrap();
        assert_eq!(json, r#"["sun","wed","sat"]"#);
    }

    #[test]
    fn build_applies_default_label() {
        let alarm = draft().build("a", &SoundCatalog::default()).unwrap();
        assert_eq!(alarm.label(), DEFAULT_LABEL);
        assert_eq!(alarm.time(), AlarmTime::new(7, 0).unwrap());
        assert_eq!(alarm.days(), Days::WEEKDAYS);
    }

    #[test]
    fn build_rejects_invalid_fields() {
        let catalog = SoundCatalog::default();
        let mut no_days = draft();
        no_days.days = Days::NONE;
        assert_eq!(no_days.clone().build("a", &catalog), Err(AlarmError::EmptyDaySet));
        // a disabled alarm may be saved without days, it just never rings
        no_days.enabled = false;
        assert!(no_days.build("a", &catalog).is_ok());

        let mut loud = draft();
        loud.volume = 1.5;
        assert!(matches!(loud.build("a", &catalog), Err(AlarmError::InvalidVolume(_))));

        let mut no_snooze = draft();
        no_snooze.snooze_minutes = 0;
        assert_eq!(no_snooze.build("a", &catalog), Err(AlarmError::InvalidSnooze));

        let mut unknown = draft();
        unknown.sound = SoundChoice::Fixed("kazoo.mp3".to_string());
        assert_eq!(
            unknown.build("a", &catalog),
            Err(AlarmError::UnknownSound("kazoo.mp3".to_string()))
        );
    }

    #[test]
    fn alarm_json_uses_stored_field_names() {
        let mut d = draft();
        d.sound = SoundChoice::Fixed("zen-bell.mp3".to_string());
        let alarm = d.build("alarm_1", &SoundCatalog::default()).unwrap();
        let value = serde_json::to_value(&alarm).unwrap();
        assert_eq!(value["time"], "07:00");
        assert_eq!(value["days"], serde_json::json!(["mon", "tue", "wed", "thu", "fri"]));
        assert_eq!(value["sound"], "zen-bell.mp3");
        assert_eq!(value["snooze"], 5);
        assert_eq!(value["label"], "Alarm");
    }

    #[test]
    fn book_rejects_duplicate_ids() {
        let catalog = SoundCatalog::default();
        let mut book = AlarmBook::new();
        book.add(draft().build("a", &catalog).unwrap()).unwrap();
        assert_eq!(
            book.add(draft().build("a", &catalog).unwrap()).unwrap_err(),
            AlarmError::DuplicateId("a".to_string())
        );
        let alarms: Vec<Alarm> = vec![
            draft().build("x", &catalog).unwrap(),
            draft().build("x", &catalog).unwrap(),
        ];
        assert!(AlarmBook::try_from(alarms).is_err());
    }

    #[test]
    fn fresh_id_skips_taken_ids() {
        let catalog = SoundCatalog::default();
        let mut book = AlarmBook::new();
        assert_eq!(book.fresh_id(100), "alarm_100");
        book.add(draft().build("alarm_100", &catalog).unwrap()).unwrap();
        assert_eq!(book.fresh_id(100), "alarm_101");
    }

    #[test]
    fn replace_keeps_id_and_position() {
        let catalog = SoundCatalog::default();
        let mut book = AlarmBook::sample();
        let mut changed = AlarmDraft::from(book.get("alarm1").unwrap());
        changed.label = "Gym".to_string();
        changed.time = AlarmTime::new(6, 15).unwrap();
        book.replace("alarm1", changed, &catalog).unwrap();
        let first = &book.as_slice()[0];
        assert_eq!(first.id(), "alarm1");
        assert_eq!(first.label(), "Gym");
        assert_eq!(first.time(), AlarmTime::new(6, 15).unwrap());
        assert_eq!(
            book.replace("missing", draft(), &catalog).unwrap_err(),
            AlarmError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn toggle_and_remove() {
        let catalog = SoundCatalog::default();
        let mut book = AlarmBook::sample();
        assert!(book.toggle("alarm2").unwrap());
        assert!(!book.toggle("alarm2").unwrap());

        let mut empty = draft();
        empty.days = Days::NONE;
        empty.enabled = false;
        book.add(empty.build("empty", &catalog).unwrap()).unwrap();
        assert_eq!(book.toggle("empty"), Err(AlarmError::EmptyDaySet));

        let removed = book.remove("alarm1").unwrap();
        assert_eq!(removed.label(), "Work Alarm");
        assert_eq!(book.len(), 2);
        assert_eq!(book.remove("alarm1"), Err(AlarmError::NotFound("alarm1".to_string())));
    }
}
