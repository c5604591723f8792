//! Fixtures shared by unit and integration tests.

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::hijri::HijriDateResolver;
use crate::prayer::{PrayerName, TimeFormat};
use crate::raw::{AsrFactor, CalculationMethod, CalculationParams, RawTimeProvider, RawTimes};
use crate::schedule::DayScheduleBuilder;

/// Fajr, Sunrise, Dhuhr, Asr, Maghrib, Isha, Midnight of a spring day with
/// Midnight after civil midnight.
pub const SPRING_DAY: [&str; 7] = [
    "05:39", "06:52", "13:11", "16:46", "19:31", "20:44", "01:12",
];

pub fn raw_times(values: [&str; 7]) -> RawTimes {
    PrayerName::ALL
        .into_iter()
        .zip(values)
        .map(|(prayer, value)| (prayer.key().to_string(), value.to_string()))
        .collect()
}

/// Same clock strings every day, with optional per-date overrides.
#[derive(Debug, Clone)]
pub struct FixedTimesProvider {
    default: RawTimes,
    days: BTreeMap<NaiveDate, RawTimes>,
    format: TimeFormat,
}

impl FixedTimesProvider {
    pub fn new(values: [&str; 7]) -> Self {
        Self {
            default: raw_times(values),
            days: BTreeMap::new(),
            format: TimeFormat::H24,
        }
    }

    pub fn with_format(mut self, format: TimeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_day(mut self, date: NaiveDate, values: [&str; 7]) -> Self {
        self.days.insert(date, raw_times(values));
        self
    }

    pub fn with_raw_day(mut self, date: NaiveDate, raw: RawTimes) -> Self {
        self.days.insert(date, raw);
        self
    }
}

impl RawTimeProvider for FixedTimesProvider {
    fn raw_times(&self, date: NaiveDate, _params: &CalculationParams) -> Result<RawTimes> {
        Ok(self.days.get(&date).unwrap_or(&self.default).clone())
    }

    fn time_format(&self) -> TimeFormat {
        self.format
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

pub fn params(time_zone: Tz) -> CalculationParams {
    CalculationParams {
        latitude: 3.139,
        longitude: 101.6869,
        time_zone,
        method: CalculationMethod::Mwl,
        asr_factor: AsrFactor::Standard,
    }
}

/// English labels, 24-hour display.
pub fn builder(provider: impl RawTimeProvider + 'static, time_zone: Tz) -> DayScheduleBuilder {
    DayScheduleBuilder::new(
        Box::new(provider),
        params(time_zone),
        HijriDateResolver::new("en", 0),
        TimeFormat::H24,
    )
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}
