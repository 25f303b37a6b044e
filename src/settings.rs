// src/settings.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Refresh cadence in hours. Only 3, 6 and 12 are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RefreshInterval(u32);

impl RefreshInterval {
    pub const ALLOWED: [u32; 3] = [3, 6, 12];

    pub fn hours(self) -> u32 {
        self.0
    }

    pub fn period(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 3600)
    }

    pub fn as_millis(self) -> i64 {
        i64::from(self.0) * 3_600_000
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        RefreshInterval(6)
    }
}

impl TryFrom<u32> for RefreshInterval {
    type Error = String;

    fn try_from(h: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&h) {
            Ok(RefreshInterval(h))
        } else {
            Err(format!("refresh interval must be one of 3, 6, 12 hours (got {h})"))
        }
    }
}

impl From<RefreshInterval> for u32 {
    fn from(r: RefreshInterval) -> u32 {
        r.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
    Jp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(alias = "refreshIntervalHours", default)]
    pub refresh_interval: RefreshInterval,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub language: Language,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_install() {
        let s = Settings::default();
        assert_eq!(s.refresh_interval.hours(), 6);
        assert!(!s.dark_mode);
        assert_eq!(s.language, Language::Ko);
        let v = serde_json::to_value(s).unwrap();
        assert_eq!(v, serde_json::json!({"refreshInterval": 6, "darkMode": false, "language": "ko"}));
    }

    #[test]
    fn interval_outside_allowed_set_is_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"{"refreshInterval": 5}"#).is_err());
        let s: Settings = serde_json::from_str(r#"{"refreshIntervalHours": 12, "language": "jp"}"#).unwrap();
        assert_eq!(s.refresh_interval.hours(), 12);
        assert_eq!(s.refresh_interval.period(), Duration::from_secs(12 * 3600));
        assert!(serde_json::from_str::<Settings>(r#"{"language": "de"}"#).is_err());
    }
}
