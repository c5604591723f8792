//! Typed errors for the prayer core.
//!
//! Library code returns these; the binary, commands and config loader wrap
//! them in `anyhow` with context the same way every other fallible step is
//! reported.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::prayer::PrayerName;

/// Invalid or missing configuration. Fatal: nothing is computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("latitude and longitude must both be configured")]
    MissingCoordinates,

    #[error("latitude must be between -90 and 90 degrees (got {0})")]
    InvalidLatitude(f64),

    #[error("longitude must be between -180 and 180 degrees (got {0})")]
    InvalidLongitude(f64),

    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("time_format must be 12 or 24 (got {0})")]
    InvalidTimeFormat(i64),

    #[error("display_threshold ({value} minutes) must be between 0 and {max} minutes")]
    InvalidThreshold { value: u32, max: u32 },

    #[error("hijri_adjustment ({0} days) must be between -2 and 2 days")]
    InvalidHijriAdjustment(i64),

    #[error("sync_grace_seconds ({0}) must be between 1 and 30 seconds")]
    InvalidSyncGrace(u64),

    #[error("not_displayed contains unknown prayer '{0}'")]
    UnknownPrayer(String),

    #[error("schedule file not found: {}", .0.display())]
    ScheduleFileMissing(PathBuf),
}

/// The raw time source returned data that cannot form a schedule.
///
/// Recoverable: the last good schedule stays installed and the build is
/// retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleBuildError {
    #[error("{date}: raw times are missing {field}")]
    MissingField { date: NaiveDate, field: PrayerName },

    #[error("{date}: cannot parse {field} time '{value}'")]
    InvalidTime {
        date: NaiveDate,
        field: PrayerName,
        value: String,
    },

    #[error("{date}: {field} does not fall after {}", .field.previous())]
    OutOfOrder { date: NaiveDate, field: PrayerName },

    #[error("{date}: raw time provider failed: {message}")]
    Provider { date: NaiveDate, message: String },
}

impl ScheduleBuildError {
    /// Civil date whose build failed.
    pub fn date(&self) -> NaiveDate {
        match self {
            ScheduleBuildError::MissingField { date, .. }
            | ScheduleBuildError::InvalidTime { date, .. }
            | ScheduleBuildError::OutOfOrder { date, .. }
            | ScheduleBuildError::Provider { date, .. } => *date,
        }
    }

    /// Offending prayer field, when the failure is tied to one.
    pub fn field(&self) -> Option<PrayerName> {
        match self {
            ScheduleBuildError::MissingField { field, .. }
            | ScheduleBuildError::InvalidTime { field, .. }
            | ScheduleBuildError::OutOfOrder { field, .. } => Some(*field),
            ScheduleBuildError::Provider { .. } => None,
        }
    }
}

/// Every error kind the prayer core can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ScheduleBuild(#[from] ScheduleBuildError),

    /// Non-fatal: Hijri dates fall back to numeric formatting.
    #[error("no Hijri month names for language '{language}', using numeric dates")]
    LocaleUnavailable { language: String },

    /// Non-fatal: the countdown is clamped to 0 and the clock cold-seeded.
    #[error("wall clock is {overdue_minutes} minute(s) past the next prayer")]
    ClockSkewDetected { overdue_minutes: i64 },
}
