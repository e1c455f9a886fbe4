//! The polling side of the alarm clock.
//!
//! The scheduler only answers questions about time. Everything stateful that
//! comes with actually ringing alarms lives here: which minute each alarm
//! last fired in, and whether an alarm is sounding or snoozed.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use log::{debug, info};

use crate::{
    alarm::{Alarm, AlarmBook},
    communication::{Message, MessageType},
    scheduler, AlarmClock,
};

/// Source of the current time.
///
/// One reading gives both the local wall clock (for alarm times) and the
/// absolute instant (for the rotation).
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().into()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// wall clock time of a reading
#[must_use]
pub fn local(now: DateTime<FixedOffset>) -> NaiveDateTime {
    now.naive_local()
}

/// absolute instant of a reading
#[must_use]
pub fn utc(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    now.with_timezone(&Utc)
}

/// Turns the level triggered [`scheduler::should_trigger`] into one firing
/// per alarm per minute, however often it is polled.
#[derive(Debug, Clone, Default)]
pub struct TriggerGuard {
    last_fired: HashMap<String, (NaiveDate, u32, u32)>,
}

impl TriggerGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// alarms that should ring at `reference` and haven't yet this minute
    pub fn due<'a>(
        &mut self,
        alarms: impl IntoIterator<Item = &'a Alarm>,
        reference: NaiveDateTime,
    ) -> Vec<&'a Alarm> {
        let minute = (reference.date(), reference.hour(), reference.minute());
        alarms
            .into_iter()
            .filter(|alarm| scheduler::should_trigger(alarm, reference))
            .filter(|alarm| {
                let fresh = self.last_fired.get(alarm.id()) != Some(&minute);
                if fresh {
                    self.last_fired.insert(alarm.id().to_string(), minute);
                }
                fresh
            })
            .collect()
    }

    /// drops what is remembered about an alarm that was edited or removed
    pub fn forget(&mut self, alarm_id: &str) {
        self.last_fired.remove(alarm_id);
    }

    /// drops what is remembered about alarms no longer in `alarms`
    pub fn prune(&mut self, alarms: &AlarmBook) {
        self.last_fired.retain(|alarm_id, _| alarms.get(alarm_id).is_some());
    }
}

/// Whether an alarm is currently demanding attention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Sounding {
        alarm_id: String,
    },
    Snoozed {
        alarm_id: String,
        until: NaiveDateTime,
    },
}

impl AlarmState {
    #[must_use]
    pub fn alarm_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Sounding { alarm_id } | Self::Snoozed { alarm_id, .. } => Some(alarm_id),
        }
    }
}

/// The one active alarm. A new trigger replaces whatever was sounding or
/// snoozed.
#[derive(Debug, Clone, Default)]
pub struct Ringer {
    state: AlarmState,
}

impl Ringer {
    #[must_use]
    pub const fn state(&self) -> &AlarmState {
        &self.state
    }

    /// starts sounding `alarm_id`, returning the alarm it displaced
    pub fn start(&mut self, alarm_id: &str) -> Option<String> {
        let previous = std::mem::replace(
            &mut self.state,
            AlarmState::Sounding {
                alarm_id: alarm_id.to_string(),
            },
        );
        previous
            .alarm_id()
            .filter(|previous| *previous != alarm_id)
            .map(ToString::to_string)
    }

    /// Defers the sounding alarm by `minutes`. Does nothing unless an alarm
    /// is sounding.
    pub fn snooze(&mut self, now: NaiveDateTime, minutes: u32) -> Option<(String, NaiveDateTime)> {
        let AlarmState::Sounding { alarm_id } = &self.state else {
            return None;
        };
        let alarm_id = alarm_id.clone();
        let until = now + Duration::minutes(i64::from(minutes));
        self.state = AlarmState::Snoozed {
            alarm_id: alarm_id.clone(),
            until,
        };
        Some((alarm_id, until))
    }

    /// silences the alarm and cancels any pending snooze
    pub fn stop(&mut self) -> Option<String> {
        std::mem::take(&mut self.state)
            .alarm_id()
            .map(ToString::to_string)
    }

    /// the snoozed alarm, once its snooze has run out
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<String> {
        match &self.state {
            AlarmState::Snoozed { alarm_id, until } if now >= *until => {
                let alarm_id = alarm_id.clone();
                self.state = AlarmState::Sounding {
                    alarm_id: alarm_id.clone(),
                };
                Some(alarm_id)
            }
            _ => None,
        }
    }
}

/// What the user can type while alarms are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Stop,
    Snooze,
    Quit,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" | "x" => Ok(Self::Stop),
            "snooze" | "s" => Ok(Self::Snooze),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command {other:?}, expected stop, snooze or quit")),
        }
    }
}

/// Trigger detection plus ringing state, producing messages for the alert
/// thread.
#[derive(Debug, Clone, Default)]
pub struct Host {
    guard: TriggerGuard,
    ringer: Ringer,
}

impl Host {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &AlarmState {
        self.ringer.state()
    }

    fn trigger(
        &mut self,
        clock: &AlarmClock,
        alarm: &Alarm,
        now: DateTime<FixedOffset>,
        out: &mut Vec<Message>,
    ) {
        if let Some(previous) = self.ringer.start(alarm.id()) {
            info!("alarm {previous} replaced by {}", alarm.id());
            out.push(Message::new(MessageType::AlarmStopped, previous));
        }
        let sound = clock.resolve_sound(alarm, utc(now)).clone();
        info!("alarm {} ({}) triggered with {}", alarm.id(), alarm.label(), sound.name);
        out.push(Message::new(
            MessageType::AlarmTriggered {
                label: alarm.label().to_string(),
                sound,
                volume: alarm.volume(),
                gradual_wakeup: clock.settings().gradual_wakeup,
            },
            alarm.id(),
        ));
    }

    /// one poll of the alarms at `now`
    pub fn tick(&mut self, clock: &AlarmClock, now: DateTime<FixedOffset>) -> Vec<Message> {
        let reference = local(now);
        let mut out = Vec::new();
        self.guard.prune(clock.alarms());
        if let Some(alarm_id) = self.ringer.poll(reference) {
            match clock.alarms().get(&alarm_id) {
                Some(alarm) => self.trigger(clock, alarm, now, &mut out),
                None => {
                    debug!("snoozed alarm {alarm_id} no longer exists");
                    self.ringer.stop();
                }
            }
        }
        for alarm in self.guard.due(clock.alarms(), reference) {
            self.trigger(clock, alarm, now, &mut out);
        }
        out
    }

    /// Applies a user command. `Quit` is left to the caller.
    pub fn handle(
        &mut self,
        command: HostCommand,
        clock: &AlarmClock,
        now: DateTime<FixedOffset>,
    ) -> Vec<Message> {
        match command {
            HostCommand::Stop => self
                .ringer
                .stop()
                .map(|alarm_id| Message::new(MessageType::AlarmStopped, alarm_id))
                .into_iter()
                .collect(),
            HostCommand::Snooze => {
                let Some(alarm_id) = self.ringer.state().alarm_id().map(ToString::to_string) else {
                    return Vec::new();
                };
                let minutes = clock
                    .alarms()
                    .get(&alarm_id)
                    .map_or(clock.settings().default_snooze, Alarm::snooze_minutes);
                self.ringer
                    .snooze(local(now), minutes)
                    .map(|(alarm_id, until)| Message::new(MessageType::AlarmSnoozed { until }, alarm_id))
                    .into_iter()
                    .collect()
            }
            HostCommand::Quit => Vec::new(),
        }
    }

    /// Picks up alarms other processes saved. Edited or removed alarms are
    /// forgotten, and stopped if they were ringing or snoozed.
    pub fn reload(&mut self, clock: &mut AlarmClock) -> Vec<Message> {
        clock
            .reload()
            .iter()
            .filter_map(|alarm_id| {
                debug!("alarm {alarm_id} changed on disk");
                self.forget(alarm_id)
            })
            .collect()
    }

    /// forgets an alarm that was edited or deleted, stopping it if active
    pub fn forget(&mut self, alarm_id: &str) -> Option<Message> {
        self.guard.forget(alarm_id);
        if self.ringer.state().alarm_id() == Some(alarm_id) {
            self.ringer.stop();
            return Some(Message::new(MessageType::AlarmStopped, alarm_id));
        }
        None
    }
}
