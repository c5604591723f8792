//! Absolute prayer instants for one civil day.
//!
//! The builder turns the provider's clock strings into zoned timestamps and
//! settles the one question the strings leave open: which civil day a
//! Midnight of `00:12` belongs to. A Midnight that reads earlier than noon
//! is tonight's Midnight after civil midnight, so it is anchored on the next
//! civil date.
//!
//! Anchoring in a zone with DST follows two rules. A clock time that occurs
//! twice (fall back) resolves to the earlier instant. A clock time that does
//! not exist (spring forward) moves one hour later, into the valid range.

use anyhow::Result;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::common::constants::MIDNIGHT_ROLLOVER_HOUR;
use crate::config::Config;
use crate::error::ScheduleBuildError;
use crate::hijri::HijriDateResolver;
use crate::prayer::{PrayerName, TimeFormat};
use crate::raw::{CalculationParams, RawTimeProvider, RawTimes, provider_from_config};

/// One prayer of a built day.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerInstant {
    pub name: PrayerName,
    pub time: DateTime<Tz>,
    pub hijri_label: String,
    /// Whole minutes until the next entry of the cycle. For Midnight this is
    /// the following day's Fajr.
    pub minutes_until_next: i64,
}

/// Seven strictly increasing instants for one civil date. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    date: NaiveDate,
    instants: [PrayerInstant; 7],
    previous_midnight: PrayerInstant,
    next_fajr: DateTime<Tz>,
    time_strings: BTreeMap<PrayerName, String>,
}

impl DaySchedule {
    /// Civil date this schedule was built for.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn instants(&self) -> &[PrayerInstant; 7] {
        &self.instants
    }

    pub fn instant(&self, prayer: PrayerName) -> &PrayerInstant {
        &self.instants[prayer.index()]
    }

    /// The previous civil day's Midnight, labelled the way that day labels it.
    pub fn previous_midnight(&self) -> &PrayerInstant {
        &self.previous_midnight
    }

    /// Fajr of the following civil date.
    pub fn next_fajr(&self) -> DateTime<Tz> {
        self.next_fajr
    }

    /// Instant that ends `prayer`'s period.
    pub fn end_of(&self, prayer: PrayerName) -> DateTime<Tz> {
        match prayer {
            PrayerName::Midnight => self.next_fajr,
            other => self.instant(other.next()).time,
        }
    }

    /// Display strings in the configured clock format.
    pub fn time_strings(&self) -> &BTreeMap<PrayerName, String> {
        &self.time_strings
    }

    /// Latest prayer whose instant is at or before `now`, scanning from
    /// Midnight back to Fajr. `None` before this day's Fajr.
    pub fn locate<Z: TimeZone>(&self, now: &DateTime<Z>) -> Option<PrayerName> {
        self.instants
            .iter()
            .rev()
            .find(|instant| instant.time <= *now)
            .map(|instant| instant.name)
    }
}

/// Builds [`DaySchedule`]s from a raw time provider.
pub struct DayScheduleBuilder {
    provider: Box<dyn RawTimeProvider>,
    params: CalculationParams,
    hijri: HijriDateResolver,
    display_format: TimeFormat,
}

impl DayScheduleBuilder {
    pub fn new(
        provider: Box<dyn RawTimeProvider>,
        params: CalculationParams,
        hijri: HijriDateResolver,
        display_format: TimeFormat,
    ) -> Self {
        Self {
            provider,
            params,
            hijri,
            display_format,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            provider_from_config(config)?,
            config.calculation_params()?,
            HijriDateResolver::new(config.language(), config.hijri_adjustment()),
            config.time_format(),
        ))
    }

    pub fn params(&self) -> &CalculationParams {
        &self.params
    }

    pub fn time_zone(&self) -> Tz {
        self.params.time_zone
    }

    pub fn hijri(&self) -> &HijriDateResolver {
        &self.hijri
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Build the schedule for `date`.
    ///
    /// Also reads the neighbouring dates: the previous day for its Midnight
    /// and the next day for the Fajr that ends this day's Midnight. Nothing
    /// partial is returned.
    pub fn build(&self, date: NaiveDate) -> Result<DaySchedule, ScheduleBuildError> {
        let yesterday = date.pred_opt().unwrap_or(date);
        let tomorrow = date.succ_opt().unwrap_or(date);

        let raw = self.fetch(date)?;
        let mut times = Vec::with_capacity(PrayerName::ALL.len());
        for prayer in PrayerName::ALL {
            let time = self.anchor_field(date, &raw, prayer)?;
            if times.last().is_some_and(|previous| time <= *previous) {
                return Err(ScheduleBuildError::OutOfOrder {
                    date,
                    field: prayer,
                });
            }
            times.push(time);
        }

        let next_fajr = {
            let raw = self.fetch(tomorrow)?;
            self.anchor_field(tomorrow, &raw, PrayerName::Fajr)?
        };
        let midnight = times[PrayerName::Midnight.index()];
        if next_fajr <= midnight {
            return Err(ScheduleBuildError::OutOfOrder {
                date: tomorrow,
                field: PrayerName::Fajr,
            });
        }

        let previous_midnight = {
            let raw = self.fetch(yesterday)?;
            let time = self.anchor_field(yesterday, &raw, PrayerName::Midnight)?;
            PrayerInstant {
                name: PrayerName::Midnight,
                time,
                hijri_label: self.hijri.resolve(yesterday, true),
                minutes_until_next: (times[PrayerName::Fajr.index()] - time).num_minutes(),
            }
        };

        let mut time_strings = BTreeMap::new();
        let instants = PrayerName::ALL.map(|prayer| {
            let time = times[prayer.index()];
            let end = match prayer {
                PrayerName::Midnight => next_fajr,
                other => times[other.next().index()],
            };
            time_strings.insert(prayer, self.display_format.format(&time));
            PrayerInstant {
                name: prayer,
                time,
                hijri_label: self.hijri.resolve(date, prayer.advances_hijri()),
                minutes_until_next: (end - time).num_minutes(),
            }
        });

        Ok(DaySchedule {
            date,
            instants,
            previous_midnight,
            next_fajr,
            time_strings,
        })
    }

    fn fetch(&self, date: NaiveDate) -> Result<RawTimes, ScheduleBuildError> {
        self.provider
            .raw_times(date, &self.params)
            .map_err(|e| ScheduleBuildError::Provider {
                date,
                message: format!("{e:#}"),
            })
    }

    /// Parse one field and anchor it on `date` (Midnight before noon on the
    /// day after). An afternoon Midnight stays on `date` even when it is not
    /// after Isha; the day after would put it past the next Fajr, so the
    /// ordering check rejects it instead.
    fn anchor_field(
        &self,
        date: NaiveDate,
        raw: &RawTimes,
        prayer: PrayerName,
    ) -> Result<DateTime<Tz>, ScheduleBuildError> {
        let value = raw
            .get(prayer.key())
            .ok_or(ScheduleBuildError::MissingField {
                date,
                field: prayer,
            })?;
        let clock = self
            .provider
            .time_format()
            .parse(value)
            .ok_or_else(|| ScheduleBuildError::InvalidTime {
                date,
                field: prayer,
                value: value.clone(),
            })?;

        let civil = if prayer == PrayerName::Midnight && is_after_civil_midnight(clock) {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };
        Ok(anchor_local(self.params.time_zone, civil.and_time(clock)))
    }
}

fn is_after_civil_midnight(clock: NaiveTime) -> bool {
    clock < NaiveTime::from_hms_opt(MIDNIGHT_ROLLOVER_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Local wall time to an instant: earliest of an overlap, one hour later
/// inside a gap.
pub fn anchor_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(time) => time,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&local)),
    }
}

#[cfg(test)]
mod tests;
