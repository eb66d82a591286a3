//! Persisted engine settings.
//!
//! Covers the knobs the surrounding app reads from the core: whether
//! reminder notifications are wanted and how often, plus the per-question
//! countdown the presentation layer applies. The core never fires a
//! notification itself; it only exposes the trigger inputs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Unit for the reminder frequency value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyUnit {
    Hours,
    Minutes,
    Seconds,
}

impl Default for FrequencyUnit {
    fn default() -> Self {
        Self::Hours
    }
}

/// Delay until the next reminder for a frequency value and unit.
pub fn next_reminder_delay(value: u64, unit: FrequencyUnit) -> Duration {
    let secs = match unit {
        FrequencyUnit::Hours => value * 3600,
        FrequencyUnit::Minutes => value * 60,
        FrequencyUnit::Seconds => value,
    };
    Duration::from_secs(secs)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub notification_frequency: u64,
    pub frequency_unit: FrequencyUnit,
    /// Seconds the presentation layer gives the user per question
    pub question_delay_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: false,
            notification_frequency: 24,
            frequency_unit: FrequencyUnit::Hours,
            question_delay_secs: 15,
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Default settings file location under the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("quizdrill").join("settings.json"))
    }

    /// The trigger read by the external notification scheduler.
    pub fn should_notify(&self) -> bool {
        self.notifications_enabled
    }

    /// Delay until the next reminder with the configured frequency.
    pub fn reminder_delay(&self) -> Duration {
        next_reminder_delay(self.notification_frequency, self.frequency_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_delay_per_unit() {
        assert_eq!(
            next_reminder_delay(2, FrequencyUnit::Hours),
            Duration::from_secs(7200)
        );
        assert_eq!(
            next_reminder_delay(30, FrequencyUnit::Minutes),
            Duration::from_secs(1800)
        );
        assert_eq!(
            next_reminder_delay(45, FrequencyUnit::Seconds),
            Duration::from_secs(45)
        );
    }

    #[test]
    fn defaults_are_off_daily() {
        let settings = Settings::default();
        assert!(!settings.should_notify());
        assert_eq!(settings.reminder_delay(), Duration::from_secs(24 * 3600));
        assert_eq!(settings.question_delay_secs, 15);
    }

    #[test]
    fn roundtrips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.notifications_enabled = true;
        settings.notification_frequency = 10;
        settings.frequency_unit = FrequencyUnit::Minutes;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }
}
