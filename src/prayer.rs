//! Prayer names and clock-time formats.

use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// The seven entries of the daily cycle, in order.
///
/// Sunrise and Midnight are shown but are not prayers in their own right;
/// they still take part in the cycle like every other entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
    Midnight,
}

impl PrayerName {
    pub const ALL: [PrayerName; 7] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
        PrayerName::Midnight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Cyclic successor; Midnight wraps to Fajr.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Cyclic predecessor; Fajr wraps to Midnight.
    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// False for Sunrise and Midnight.
    pub fn is_canonical(self) -> bool {
        !matches!(self, PrayerName::Sunrise | PrayerName::Midnight)
    }

    /// The Islamic day starts at Maghrib, so these carry the next day's Hijri date.
    pub fn advances_hijri(self) -> bool {
        matches!(
            self,
            PrayerName::Maghrib | PrayerName::Isha | PrayerName::Midnight
        )
    }

    /// Lowercase key used in raw time maps and config files.
    pub fn key(self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Sunrise => "sunrise",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
            PrayerName::Midnight => "midnight",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
            PrayerName::Midnight => "Midnight",
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 12- or 24-hour clock, written as `12` or `24` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i64")]
pub enum TimeFormat {
    H12,
    H24,
}

impl TryFrom<i64> for TimeFormat {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            12 => Ok(TimeFormat::H12),
            24 => Ok(TimeFormat::H24),
            other => Err(ConfigError::InvalidTimeFormat(other)),
        }
    }
}

impl TimeFormat {
    pub fn hours(self) -> u8 {
        match self {
            TimeFormat::H12 => 12,
            TimeFormat::H24 => 24,
        }
    }

    /// Display pattern: `h:mm AM` or `HH:MM`.
    fn display_pattern(self) -> &'static str {
        match self {
            TimeFormat::H12 => "%-I:%M %p",
            TimeFormat::H24 => "%H:%M",
        }
    }

    pub fn format<Tz: TimeZone>(self, time: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        time.format(self.display_pattern()).to_string()
    }

    /// Parse a raw clock string written in this format.
    pub fn parse(self, raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        let patterns: &[&str] = match self {
            TimeFormat::H12 => &["%I:%M %p", "%I:%M%p"],
            TimeFormat::H24 => &["%H:%M", "%H:%M:%S"],
        };
        patterns
            .iter()
            .find_map(|pattern| NaiveTime::parse_from_str(raw, pattern).ok())
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-hour", self.hours())
    }
}
