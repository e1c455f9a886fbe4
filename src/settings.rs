use std::{fmt, ops::Not, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Not for Theme {
    type Output = Self;

    /// auto toggles to light, like any theme that isn't light
    fn not(self) -> Self::Output {
        match self {
            Self::Light => Self::Dark,
            Self::Dark | Self::Auto => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown theme {other:?}, expected light, dark or auto")),
        }
    }
}

/// User preferences stored next to the alarms.
///
/// Keys missing from stored settings take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    /// when off, rotating alarms stay on the first catalog sound
    pub enable_rotation: bool,
    /// ramp the alert volume up instead of starting at full volume
    pub gradual_wakeup: bool,
    pub default_snooze: u32,
    pub default_volume: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            enable_rotation: true,
            gradual_wakeup: true,
            default_snooze: 5,
            default_volume: 0.8,
        }
    }
}

impl Settings {
    /// # Errors
    /// when the defaults applied to new alarms would be invalid
    pub fn validate(&self) -> Result<(), AlarmError> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(AlarmError::InvalidVolume(self.default_volume.to_string()));
        }
        if self.default_snooze == 0 {
            return Err(AlarmError::InvalidSnooze);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"dark","defaultSnooze":9}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.default_snooze, 9);
        assert!(settings.enable_rotation);
        assert!(settings.gradual_wakeup);
        assert!((settings.default_volume - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_camel_case_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["enableRotation"], true);
        assert_eq!(value["gradualWakeup"], true);
        assert_eq!(value["defaultSnooze"], 5);
        assert_eq!(value["theme"], "light");
    }

    #[test]
    fn theme_toggles_between_light_and_dark() {
        assert_eq!(!Theme::Light, Theme::Dark);
        assert_eq!(!Theme::Dark, Theme::Light);
        assert_eq!(!Theme::Auto, Theme::Light);
        assert_eq!("Auto".parse::<Theme>(), Ok(Theme::Auto));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn validate_rejects_bad_defaults() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.default_volume = -0.1;
        assert!(matches!(settings.validate(), Err(AlarmError::InvalidVolume(_))));
        settings.default_volume = 0.5;
        settings.default_snooze = 0;
        assert_eq!(settings.validate(), Err(AlarmError::InvalidSnooze));
    }
}
