//! Raw times read from a published timetable.
//!
//! Mosques and national authorities publish yearly timetables that differ
//! from any single calculation method. The file is JSON, one entry per day
//! of the year:
//!
//! ```json
//! { "schedule": [ { "day": 1, "times": { "fajr": "06:10", "sunrise": "07:28", ... } } ] }
//! ```
//!
//! Days missing from the table wrap around to the nearest earlier entry, so
//! a 365-day table also answers for 31 December of a leap year.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{CalculationParams, RawTimeProvider, RawTimes};
use crate::common::utils::private_path;
use crate::error::ConfigError;
use crate::prayer::TimeFormat;

#[derive(Debug, Deserialize)]
struct TimetableFile {
    schedule: Vec<TimetableDay>,
}

#[derive(Debug, Deserialize)]
struct TimetableDay {
    day: u32,
    times: RawTimes,
}

/// Timetable keyed by day of the year (1-366).
#[derive(Debug, Clone)]
pub struct TableProvider {
    path: PathBuf,
    days: BTreeMap<u32, RawTimes>,
    format: TimeFormat,
}

impl TableProvider {
    pub fn from_path(path: &Path, format: TimeFormat) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::ScheduleFileMissing(path.to_path_buf()).into());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schedule file {}", private_path(path)))?;
        Self::from_json(&content, format)
            .map(|provider| Self {
                path: path.to_path_buf(),
                ..provider
            })
            .with_context(|| format!("Invalid schedule file {}", private_path(path)))
    }

    pub fn from_json(content: &str, format: TimeFormat) -> Result<Self> {
        let file: TimetableFile = serde_json::from_str(content)?;
        if file.schedule.is_empty() {
            bail!("schedule contains no days");
        }
        let mut days = BTreeMap::new();
        for entry in file.schedule {
            if !(1..=366).contains(&entry.day) {
                bail!("day {} is outside 1-366", entry.day);
            }
            if days.insert(entry.day, entry.times).is_some() {
                bail!("day {} appears more than once", entry.day);
            }
        }
        Ok(Self {
            path: PathBuf::new(),
            days,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    fn lookup(&self, ordinal: u32) -> Option<&RawTimes> {
        self.days
            .range(..=ordinal)
            .next_back()
            .or_else(|| self.days.iter().next_back())
            .map(|(_, times)| times)
    }
}

impl RawTimeProvider for TableProvider {
    fn raw_times(&self, date: NaiveDate, _params: &CalculationParams) -> Result<RawTimes> {
        self.lookup(date.ordinal())
            .cloned()
            .with_context(|| format!("no timetable entry for day {}", date.ordinal()))
    }

    fn time_format(&self) -> TimeFormat {
        self.format
    }

    fn name(&self) -> &'static str {
        "table"
    }
}
