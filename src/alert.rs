use std::{
    io::Write,
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use chrono::NaiveDateTime;
use log::{info, warn};

use crate::{
    communication::{Message, MessageType},
    rotation::SoundEntry,
};

/// volume a gradual wake up starts at, and how much it rises each beep
const RAMP_STEP: f64 = 0.1;

/// Alert volumes for successive beeps.
///
/// With gradual wake up the volume climbs by a tenth per beep until it
/// reaches the alarm volume, otherwise every beep is at the alarm volume.
/// The iterator never ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRamp {
    target: f64,
    gradual: bool,
    beeps: u32,
}

impl VolumeRamp {
    #[must_use]
    pub const fn new(target: f64, gradual: bool) -> Self {
        Self {
            target,
            gradual,
            beeps: 0,
        }
    }
}

impl Iterator for VolumeRamp {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.beeps = self.beeps.saturating_add(1);
        if self.gradual {
            Some((RAMP_STEP * f64::from(self.beeps)).min(self.target))
        } else {
            Some(self.target)
        }
    }
}

/// Makes a ringing alarm noticeable. Rendering is up to the implementation.
pub trait Alerter {
    fn start(&mut self, alarm_id: &str, label: &str, sound: &SoundEntry);
    fn beep(&mut self, volume: f64);
    fn stop(&mut self, alarm_id: &str);
    fn snoozed(&mut self, alarm_id: &str, until: NaiveDateTime);
}

/// Rings the terminal bell and prints what is happening.
pub struct TerminalAlerter<W: Write> {
    out: W,
}

impl<W: Write> TerminalAlerter<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("couldn't write alert: {e}");
        }
    }
}

impl<W: Write> Alerter for TerminalAlerter<W> {
    fn start(&mut self, alarm_id: &str, label: &str, sound: &SoundEntry) {
        info!("alarm {alarm_id} ringing with {}", sound.name);
        self.emit(&format!(
            "⏰ {label} is ringing ({}). Type `snooze` or `stop`.",
            sound.name
        ));
    }

    fn beep(&mut self, volume: f64) {
        // louder alarms ring the bell more often per beep
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rings = ((volume * 3.0).ceil() as usize).clamp(1, 3);
        self.emit(&"\x07".repeat(rings));
    }

    fn stop(&mut self, alarm_id: &str) {
        info!("alarm {alarm_id} stopped");
        self.emit("alarm stopped");
    }

    fn snoozed(&mut self, alarm_id: &str, until: NaiveDateTime) {
        info!("alarm {alarm_id} snoozed until {until}");
        self.emit(&format!("snoozed until {}", until.format("%H:%M")));
    }
}

/// Runs until every sender is dropped, beeping once per `cycle` while an
/// alarm is sounding.
pub fn run_alert_loop(rx: &Receiver<Message>, alerter: &mut impl Alerter, cycle: Duration) {
    let mut sounding: Option<VolumeRamp> = None;
    loop {
        match rx.recv_timeout(cycle) {
            Ok(Message {
                kind:
                    MessageType::AlarmTriggered {
                        label,
                        sound,
                        volume,
                        gradual_wakeup,
                    },
                alarm_id,
            }) => {
                alerter.start(&alarm_id, &label, &sound);
                let mut ramp = VolumeRamp::new(volume, gradual_wakeup);
                if let Some(volume) = ramp.next() {
                    alerter.beep(volume);
                }
                sounding = Some(ramp);
            }
            Ok(Message {
                kind: MessageType::AlarmStopped,
                alarm_id,
            }) => {
                sounding = None;
                alerter.stop(&alarm_id);
            }
            Ok(Message {
                kind: MessageType::AlarmSnoozed { until },
                alarm_id,
            }) => {
                sounding = None;
                alerter.snoozed(&alarm_id, until);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(volume) = sounding.as_mut().and_then(Iterator::next) {
                    alerter.beep(volume);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
