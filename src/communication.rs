use chrono::NaiveDateTime;

use crate::rotation::SoundEntry;

/// Sent from the alarm checking loop to the alert thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: String,
}

impl Message {
    #[must_use]
    pub fn new(kind: MessageType, alarm_id: impl Into<String>) -> Self {
        Self {
            kind,
            alarm_id: alarm_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageType {
    AlarmTriggered {
        label: String,
        sound: SoundEntry,
        volume: f64,
        gradual_wakeup: bool,
    },
    // stopped by the user, or the alarm was replaced by another one
    AlarmStopped,
    AlarmSnoozed {
        until: NaiveDateTime,
    },
}
