//! The prayer state machine.
//!
//! [`PrayerClock`] owns the one mutable [`PrayerState`] and the schedule it
//! was derived from. Everything outside gets [`Snapshot`]s.
//!
//! The clock moves forward one entry at a time. Most moves are index
//! arithmetic on the installed schedule; the two moves that cross into a
//! new civil day (Isha to Midnight, Midnight to Fajr) rebuild the schedule
//! for the current date and seed from it instead.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::common::constants::{MAX_CATCH_UP_STEPS, SKEW_TOLERANCE_MINUTES};
use crate::error::ScheduleBuildError;
use crate::prayer::PrayerName;
use crate::schedule::{DaySchedule, DayScheduleBuilder};

/// Current/next pair and the countdown between them.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerState {
    pub current: PrayerName,
    pub next: PrayerName,
    pub next_instant: DateTime<Tz>,
    pub minutes_remaining: u32,
    pub hijri_date: String,
}

/// Immutable copy of the state handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_prayer: PrayerName,
    pub next_prayer: PrayerName,
    pub minutes_remaining: u32,
    pub hijri_date_string: String,
    pub prayer_time_strings: BTreeMap<PrayerName, String>,
    pub schedule_stale: bool,
    #[serde(skip)]
    pub schedule_date: chrono::NaiveDate,
}

/// Result of one [`PrayerClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Decremented, still above zero.
    Counting(u32),
    /// Decremented to zero. The caller looks the schedule up again after
    /// its grace delay.
    ReachedZero,
    /// Was already zero and the boundary had passed: the clock moved on.
    Transitioned(PrayerName),
    /// Was already zero but the next instant is still ahead.
    AwaitingInstant,
}

/// Result of comparing the counter with a wall-clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resync {
    InSync,
    Corrected { from: u32, to: u32 },
    /// The wall clock is past the next instant by more than the tolerance.
    Skewed { overdue_minutes: i64 },
}

/// Whole minutes from `now` until `target`, rounded up, never negative.
pub fn minutes_until(target: &DateTime<Tz>, now: &DateTime<Tz>) -> u32 {
    let seconds = (*target - *now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        u32::try_from((seconds + 59) / 60).unwrap_or(u32::MAX)
    }
}

pub struct PrayerClock {
    builder: DayScheduleBuilder,
    schedule: DaySchedule,
    state: PrayerState,
    stale: bool,
}

impl PrayerClock {
    /// Build today's schedule and seed as a fresh start.
    pub fn start(builder: DayScheduleBuilder, now: DateTime<Tz>) -> Result<Self, ScheduleBuildError> {
        let schedule = builder.build(now.date_naive())?;
        let placeholder = PrayerState {
            current: PrayerName::Fajr,
            next: PrayerName::Sunrise,
            next_instant: now,
            minutes_remaining: 0,
            hijri_date: String::new(),
        };
        let mut clock = Self {
            builder,
            schedule: schedule.clone(),
            state: placeholder,
            stale: false,
        };
        clock.seed(schedule, &now, true)?;
        Ok(clock)
    }

    pub fn state(&self) -> &PrayerState {
        &self.state
    }

    pub fn schedule(&self) -> &DaySchedule {
        &self.schedule
    }

    pub fn builder(&self) -> &DayScheduleBuilder {
        &self.builder
    }

    pub fn time_zone(&self) -> Tz {
        self.builder.time_zone()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_prayer: self.state.current,
            next_prayer: self.state.next,
            minutes_remaining: self.state.minutes_remaining,
            hijri_date_string: self.state.hijri_date.clone(),
            prayer_time_strings: self.schedule.time_strings().clone(),
            schedule_stale: self.stale,
            schedule_date: self.schedule.date(),
        }
    }

    /// Determine current and next from scratch and install `schedule`.
    ///
    /// The latest instant at or before `now` is current. Before the day's
    /// Fajr the current entry is the previous night's Midnight, except on a
    /// fresh start between civil midnight and that Midnight: then the
    /// previous civil day is still running and is seeded instead.
    pub fn seed(
        &mut self,
        schedule: DaySchedule,
        now: &DateTime<Tz>,
        initial: bool,
    ) -> Result<(), ScheduleBuildError> {
        let state = match schedule.locate(now) {
            Some(current) => PrayerState {
                current,
                next: current.next(),
                next_instant: schedule.end_of(current),
                minutes_remaining: minutes_until(&schedule.end_of(current), now),
                hijri_date: schedule.instant(current).hijri_label.clone(),
            },
            None if initial && schedule.previous_midnight().time > *now => {
                let previous_day = schedule.date().pred_opt().unwrap_or(schedule.date());
                let previous = self.builder.build(previous_day)?;
                return self.seed(previous, now, false);
            }
            None => {
                let fajr = schedule.instant(PrayerName::Fajr).time;
                PrayerState {
                    current: PrayerName::Midnight,
                    next: PrayerName::Fajr,
                    next_instant: fajr,
                    minutes_remaining: minutes_until(&fajr, now),
                    hijri_date: schedule.previous_midnight().hijri_label.clone(),
                }
            }
        };
        self.schedule = schedule;
        self.state = state;
        Ok(())
    }

    /// Move to the next entry of the cycle.
    ///
    /// Leaving Isha or Midnight reseeds from a fresh build for `now`'s date.
    /// If that build fails the move still happens on the installed schedule,
    /// which is then marked stale, and the error is returned.
    pub fn advance(&mut self, now: &DateTime<Tz>) -> Result<(), ScheduleBuildError> {
        match self.state.current {
            PrayerName::Isha | PrayerName::Midnight => match self.reseed(now) {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.stale = true;
                    self.step_on_installed(now, true);
                    Err(err)
                }
            },
            _ => {
                self.step_on_installed(now, false);
                Ok(())
            }
        }
    }

    /// Rebuild for the current civil date and seed from it.
    pub fn reseed(&mut self, now: &DateTime<Tz>) -> Result<(), ScheduleBuildError> {
        let schedule = self.builder.build(now.date_naive())?;
        self.seed(schedule, now, false)?;
        self.stale = false;
        Ok(())
    }

    /// Rebuild and seed as if the process had just started.
    pub fn cold_seed(&mut self, now: &DateTime<Tz>) -> Result<(), ScheduleBuildError> {
        let schedule = self.builder.build(now.date_naive())?;
        self.seed(schedule, now, true)?;
        self.stale = false;
        Ok(())
    }

    /// O(1) step using the installed schedule. With `project` set, an end
    /// instant that already passed is moved forward by whole days so the
    /// countdown stays meaningful on an outdated schedule.
    fn step_on_installed(&mut self, now: &DateTime<Tz>, project: bool) {
        let current = self.state.next;
        let mut end = self.schedule.end_of(current);
        if project {
            while end <= *now {
                end += Duration::days(1);
            }
        }
        let label = if current == PrayerName::Fajr && self.schedule.date() < now.date_naive() {
            self.builder.hijri().resolve(now.date_naive(), false)
        } else {
            self.schedule.instant(current).hijri_label.clone()
        };
        self.state = PrayerState {
            current,
            next: current.next(),
            next_instant: end,
            minutes_remaining: minutes_until(&end, now),
            hijri_date: label,
        };
    }

    /// Decrement by exactly one minute. At zero, move on if the boundary
    /// has passed instead of going negative.
    pub fn tick(&mut self, now: &DateTime<Tz>) -> Result<TickOutcome, ScheduleBuildError> {
        if self.state.minutes_remaining > 0 {
            self.state.minutes_remaining -= 1;
            return Ok(match self.state.minutes_remaining {
                0 => TickOutcome::ReachedZero,
                n => TickOutcome::Counting(n),
            });
        }
        let before = self.state.current;
        self.catch_up(now)?;
        Ok(if self.state.current == before {
            TickOutcome::AwaitingInstant
        } else {
            TickOutcome::Transitioned(self.state.current)
        })
    }

    /// Advance until `now` is before the next instant. Falls back to a cold
    /// seed when more boundaries have passed than one night can hold.
    pub fn catch_up(&mut self, now: &DateTime<Tz>) -> Result<usize, ScheduleBuildError> {
        let mut steps = 0;
        while self.state.next_instant <= *now {
            if steps == MAX_CATCH_UP_STEPS {
                self.cold_seed(now)?;
                break;
            }
            self.advance(now)?;
            steps += 1;
        }
        self.state.minutes_remaining = minutes_until(&self.state.next_instant, now);
        Ok(steps)
    }

    /// Compare the counter with the wall clock. The wall clock wins.
    pub fn resync(&mut self, wall: &DateTime<Tz>) -> Resync {
        let overdue = (*wall - self.state.next_instant).num_minutes();
        if overdue > SKEW_TOLERANCE_MINUTES {
            self.state.minutes_remaining = 0;
            return Resync::Skewed {
                overdue_minutes: overdue,
            };
        }
        let expected = minutes_until(&self.state.next_instant, wall);
        let from = self.state.minutes_remaining;
        if expected == from {
            Resync::InSync
        } else {
            self.state.minutes_remaining = expected;
            Resync::Corrected { from, to: expected }
        }
    }

    /// The installed schedule is finished and `now` is on a later civil date.
    /// While Isha is still running the Isha to Midnight move does the rebuild.
    pub fn rollover_due(&self, now: &DateTime<Tz>) -> bool {
        now.date_naive() > self.schedule.date() && self.state.current == PrayerName::Midnight
    }

    /// Install a fresh schedule at civil-day rollover, or retry a failed
    /// build. Returns whether anything was rebuilt.
    pub fn refresh(&mut self, now: &DateTime<Tz>) -> Result<bool, ScheduleBuildError> {
        if self.stale {
            self.cold_seed(now)?;
            return Ok(true);
        }
        if self.rollover_due(now) {
            let schedule = self.builder.build(now.date_naive())?;
            self.seed(schedule, now, false)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Mark the installed schedule as outdated; the next refresh rebuilds.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedTimesProvider, SPRING_DAY, builder, date};
    use chrono::TimeZone;
    use chrono_tz::Asia::Kuala_Lumpur;

    fn at(d: chrono::NaiveDate, h: u32, m: u32) -> DateTime<Tz> {
        Kuala_Lumpur
            .from_local_datetime(&d.and_hms_opt(h, m, 0).unwrap())
            .unwrap()
    }

    fn clock_at(now: DateTime<Tz>) -> PrayerClock {
        PrayerClock::start(builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur), now).unwrap()
    }

    #[test]
    fn test_minutes_until_rounds_up() {
        let now = at(date(2024, 4, 1), 20, 42);
        assert_eq!(minutes_until(&at(date(2024, 4, 1), 20, 44), &now), 2);
        assert_eq!(minutes_until(&(now + Duration::seconds(61)), &now), 2);
        assert_eq!(minutes_until(&now, &now), 0);
        assert_eq!(minutes_until(&(now - Duration::minutes(5)), &now), 0);
    }

    #[test]
    fn test_seed_before_isha() {
        let clock = clock_at(at(date(2024, 4, 1), 20, 42));
        let state = clock.state();
        assert_eq!(state.current, PrayerName::Maghrib);
        assert_eq!(state.next, PrayerName::Isha);
        assert_eq!(state.minutes_remaining, 2);
        assert_eq!(state.hijri_date, "23 Ramadan 1445");
    }

    #[test]
    fn test_seed_at_instant_is_inclusive() {
        let clock = clock_at(at(date(2024, 4, 1), 13, 11));
        assert_eq!(clock.state().current, PrayerName::Dhuhr);
    }

    #[test]
    fn test_fresh_start_inside_previous_evening() {
        // 01:10 is before the previous day's Midnight at 01:12
        let clock = clock_at(at(date(2024, 4, 2), 1, 10));
        assert_eq!(clock.schedule().date(), date(2024, 4, 1));
        assert_eq!(clock.state().current, PrayerName::Isha);
        assert_eq!(clock.state().next, PrayerName::Midnight);
        assert_eq!(clock.state().minutes_remaining, 2);
        assert_eq!(clock.state().hijri_date, "23 Ramadan 1445");
    }

    #[test]
    fn test_fresh_start_between_midnight_and_fajr() {
        let clock = clock_at(at(date(2024, 4, 2), 1, 15));
        assert_eq!(clock.schedule().date(), date(2024, 4, 2));
        assert_eq!(clock.state().current, PrayerName::Midnight);
        assert_eq!(clock.state().next, PrayerName::Fajr);
        assert_eq!(clock.state().minutes_remaining, 264);
        // Label of the Midnight that started the window, not of Fajr
        assert_eq!(clock.state().hijri_date, "23 Ramadan 1445");
    }

    #[test]
    fn test_tick_never_goes_negative() {
        let mut clock = clock_at(at(date(2024, 4, 1), 20, 43));
        assert_eq!(clock.state().minutes_remaining, 1);
        let outcome = clock.tick(&at(date(2024, 4, 1), 20, 44)).unwrap();
        assert_eq!(outcome, TickOutcome::ReachedZero);
        assert_eq!(clock.state().minutes_remaining, 0);

        // Boundary not reached yet by the supplied clock
        let early = at(date(2024, 4, 1), 20, 43) + Duration::seconds(59);
        assert_eq!(clock.tick(&early).unwrap(), TickOutcome::AwaitingInstant);
        assert_eq!(clock.state().minutes_remaining, 1);
        clock.state.minutes_remaining = 0;

        let outcome = clock.tick(&at(date(2024, 4, 1), 20, 45)).unwrap();
        assert_eq!(outcome, TickOutcome::Transitioned(PrayerName::Isha));
        assert_eq!(clock.state().next, PrayerName::Midnight);
        assert_eq!(clock.state().minutes_remaining, 267);
    }

    #[test]
    fn test_isha_to_midnight_reseeds_for_current_date() {
        let mut clock = clock_at(at(date(2024, 4, 1), 21, 0));
        assert_eq!(clock.state().current, PrayerName::Isha);

        let now = at(date(2024, 4, 2), 1, 12);
        clock.advance(&now).unwrap();
        assert_eq!(clock.schedule().date(), date(2024, 4, 2));
        assert_eq!(clock.state().current, PrayerName::Midnight);
        assert_eq!(clock.state().next, PrayerName::Fajr);
        assert_eq!(clock.state().next_instant, at(date(2024, 4, 2), 5, 39));
        assert_eq!(clock.state().hijri_date, "23 Ramadan 1445");

        clock.advance(&at(date(2024, 4, 2), 5, 39)).unwrap();
        assert_eq!(clock.state().current, PrayerName::Fajr);
        assert_eq!(clock.state().hijri_date, "23 Ramadan 1445");
        assert_eq!(clock.state().next_instant, at(date(2024, 4, 2), 6, 52));
    }

    #[test]
    fn test_midnight_before_civil_midnight_rolls_over() {
        let day = ["05:39", "06:52", "13:11", "16:46", "19:31", "20:44", "23:48"];
        let mut clock = PrayerClock::start(
            builder(FixedTimesProvider::new(day), Kuala_Lumpur),
            at(date(2024, 4, 1), 23, 50),
        )
        .unwrap();
        assert_eq!(clock.state().current, PrayerName::Midnight);
        assert_eq!(clock.schedule().date(), date(2024, 4, 1));

        let after = at(date(2024, 4, 2), 0, 1);
        assert!(clock.rollover_due(&after));
        assert!(clock.refresh(&after).unwrap());
        assert_eq!(clock.schedule().date(), date(2024, 4, 2));
        assert_eq!(clock.state().current, PrayerName::Midnight);
        assert_eq!(clock.state().hijri_date, "23 Ramadan 1445");
        assert_eq!(clock.state().next_instant, at(date(2024, 4, 2), 5, 39));
    }

    #[test]
    fn test_no_rollover_while_isha_runs_past_civil_midnight() {
        let clock = clock_at(at(date(2024, 4, 1), 23, 0));
        assert!(!clock.rollover_due(&at(date(2024, 4, 2), 0, 30)));
    }

    #[test]
    fn test_catch_up_after_suspend() {
        let mut clock = clock_at(at(date(2024, 4, 1), 6, 0));
        assert_eq!(clock.state().current, PrayerName::Fajr);

        let steps = clock.catch_up(&at(date(2024, 4, 1), 17, 0)).unwrap();
        assert_eq!(steps, 3);
        assert_eq!(clock.state().current, PrayerName::Asr);
        assert_eq!(clock.state().minutes_remaining, 151);
    }

    #[test]
    fn test_long_suspend_cold_seeds() {
        let mut clock = clock_at(at(date(2024, 4, 1), 6, 0));
        let later = at(date(2024, 4, 4), 14, 0);
        clock.catch_up(&later).unwrap();
        assert_eq!(clock.schedule().date(), date(2024, 4, 4));
        assert_eq!(clock.state().current, PrayerName::Dhuhr);
    }

    #[test]
    fn test_resync_wall_clock_wins() {
        let mut clock = clock_at(at(date(2024, 4, 1), 14, 0));
        assert_eq!(clock.state().minutes_remaining, 166);

        assert_eq!(clock.resync(&at(date(2024, 4, 1), 14, 0)), Resync::InSync);
        assert_eq!(
            clock.resync(&at(date(2024, 4, 1), 14, 10)),
            Resync::Corrected { from: 166, to: 156 }
        );
        assert_eq!(
            clock.resync(&at(date(2024, 4, 1), 17, 0)),
            Resync::Skewed { overdue_minutes: 14 }
        );
        assert_eq!(clock.state().minutes_remaining, 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let clock = clock_at(at(date(2024, 4, 1), 20, 42));
        let json = serde_json::to_value(clock.snapshot()).unwrap();
        assert_eq!(json["currentPrayer"], "maghrib");
        assert_eq!(json["nextPrayer"], "isha");
        assert_eq!(json["minutesRemaining"], 2);
        assert_eq!(json["hijriDateString"], "23 Ramadan 1445");
        assert_eq!(json["prayerTimeStrings"]["midnight"], "01:12");
        assert_eq!(json["scheduleStale"], false);
        assert!(json.get("scheduleDate").is_none());
    }
}
