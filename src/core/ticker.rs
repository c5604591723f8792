//! Minute pulses into clock transitions.
//!
//! [`CountdownTicker`] is the only caller of [`PrayerClock`] at runtime. Each
//! pulse is handled the same way regardless of how late it arrives: bring
//! the schedule up to date, tick, let the shared wall-clock minute override
//! the counter, and hand back a snapshot when anything visible changed.

use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;

use super::clock::{PrayerClock, Resync, Snapshot, TickOutcome};
use crate::common::constants::SKEW_TOLERANCE_MINUTES;
use crate::error::PrayerError;

/// What one pulse or poll did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub outcome: Option<TickOutcome>,
    pub resync: Option<Resync>,
    /// Rebuilt at rollover or after a failed build.
    pub refreshed: bool,
    /// Recovered problems, in the order they happened.
    pub errors: Vec<PrayerError>,
    /// Set when the visible state differs from the last one handed out.
    pub snapshot: Option<Snapshot>,
}

pub struct CountdownTicker {
    clock: PrayerClock,
    grace: Duration,
    pending_lookup: Option<DateTime<Tz>>,
    last_emitted: Option<Snapshot>,
}

impl CountdownTicker {
    pub fn new(clock: PrayerClock, grace: std::time::Duration) -> Self {
        Self {
            clock,
            grace: Duration::from_std(grace).unwrap_or_else(|_| Duration::seconds(2)),
            pending_lookup: None,
            last_emitted: None,
        }
    }

    pub fn clock(&self) -> &PrayerClock {
        &self.clock
    }

    /// Snapshot for the first paint. Counts as emitted.
    pub fn initial_snapshot(&mut self) -> Snapshot {
        let snapshot = self.clock.snapshot();
        self.last_emitted = Some(snapshot.clone());
        snapshot
    }

    /// When the post-zero lookup is due, if one is pending.
    pub fn next_deadline(&self) -> Option<DateTime<Tz>> {
        self.pending_lookup
    }

    /// Handle a minute pulse. `minute_of_hour` comes from the shared wall
    /// clock and wins over the decremented counter.
    pub fn on_external_tick(
        &mut self,
        minute_of_hour: Option<u32>,
        now: DateTime<Tz>,
    ) -> TickReport {
        let mut report = TickReport::default();
        // A count derived from `now` during this pulse already includes it
        let mut rederived = self.refresh(&now, &mut report);
        rederived |= self.run_due_lookup(&now, &mut report);

        let overdue_minutes = (now - self.clock.state().next_instant).num_minutes();
        if overdue_minutes > SKEW_TOLERANCE_MINUTES {
            rederived |= self.recover_from_skew(overdue_minutes, &now, &mut report);
        }

        if !rederived {
            match self.clock.tick(&now) {
                Ok(outcome) => {
                    match outcome {
                        TickOutcome::ReachedZero => self.schedule_lookup(&now),
                        TickOutcome::Transitioned(_) => self.pending_lookup = None,
                        _ => {}
                    }
                    report.outcome = Some(outcome);
                }
                Err(err) => self.record(err.into(), &mut report),
            }
        }

        match minute_of_hour {
            Some(minute) if minute < 60 => self.resync(minute, &now, &mut report),
            Some(minute) => {
                log_warning!("Ignoring minute-of-hour pulse {minute} (expected 0-59)");
            }
            None => {}
        }

        if self.clock.state().minutes_remaining == 0 && self.pending_lookup.is_none() {
            self.schedule_lookup(&now);
        }

        report.snapshot = self.emit_if_changed();
        report
    }

    /// Run the post-zero lookup if its grace delay has passed.
    pub fn poll(&mut self, now: DateTime<Tz>) -> TickReport {
        let mut report = TickReport::default();
        self.refresh(&now, &mut report);
        self.run_due_lookup(&now, &mut report);
        report.snapshot = self.emit_if_changed();
        report
    }

    /// Whether the schedule was rebuilt and the count re-derived.
    fn refresh(&mut self, now: &DateTime<Tz>, report: &mut TickReport) -> bool {
        match self.clock.refresh(now) {
            Ok(refreshed) => {
                report.refreshed = refreshed;
                refreshed
            }
            Err(err) => {
                self.record(err.into(), report);
                false
            }
        }
    }

    /// Whether a due lookup ran. Every lookup re-derives the count.
    fn run_due_lookup(&mut self, now: &DateTime<Tz>, report: &mut TickReport) -> bool {
        let Some(deadline) = self.pending_lookup else {
            return false;
        };
        if *now < deadline {
            return false;
        }
        self.pending_lookup = None;
        let before = self.clock.state().current;
        match self.clock.catch_up(now) {
            Ok(steps) if steps > 0 => {
                log_debug!(
                    "{} -> {} after {} step(s)",
                    before,
                    self.clock.state().current,
                    steps
                );
                report.outcome = Some(TickOutcome::Transitioned(self.clock.state().current));
            }
            Ok(_) => {}
            // A failed rebuild still moved on using the installed schedule
            Err(err) => {
                self.record(err.into(), report);
                if self.clock.state().current != before {
                    report.outcome = Some(TickOutcome::Transitioned(self.clock.state().current));
                }
            }
        }
        true
    }

    fn resync(&mut self, minute: u32, now: &DateTime<Tz>, report: &mut TickReport) {
        let wall = wall_from_minute(now, minute);
        let result = self.clock.resync(&wall);
        if let Resync::Skewed { overdue_minutes } = result {
            self.recover_from_skew(overdue_minutes, now, report);
        }
        report.resync = Some(result);
    }

    /// Seed from scratch for `now`. Returns whether the cold seed succeeded.
    fn recover_from_skew(
        &mut self,
        overdue_minutes: i64,
        now: &DateTime<Tz>,
        report: &mut TickReport,
    ) -> bool {
        self.record(PrayerError::ClockSkewDetected { overdue_minutes }, report);
        let seeded = match self.clock.cold_seed(now) {
            Ok(()) => true,
            Err(err) => {
                self.record(err.into(), report);
                false
            }
        };
        self.pending_lookup = None;
        seeded
    }

    fn schedule_lookup(&mut self, now: &DateTime<Tz>) {
        self.pending_lookup = Some(*now + self.grace);
    }

    fn record(&mut self, err: PrayerError, report: &mut TickReport) {
        if matches!(err, PrayerError::ScheduleBuild(_)) {
            self.clock.mark_stale();
        }
        report.errors.push(err);
    }

    fn emit_if_changed(&mut self) -> Option<Snapshot> {
        let snapshot = self.clock.snapshot();
        if self.last_emitted.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last_emitted = Some(snapshot.clone());
        Some(snapshot)
    }
}

/// The wall instant with `minute` as minute of hour nearest to `now`.
pub fn wall_from_minute(now: &DateTime<Tz>, minute: u32) -> DateTime<Tz> {
    let start_of_minute =
        *now - Duration::seconds(i64::from(now.second())) - Duration::nanoseconds(i64::from(now.nanosecond()));
    let mut wall = start_of_minute + Duration::minutes(i64::from(minute) - i64::from(now.minute()));
    if wall - *now > Duration::minutes(30) {
        wall -= Duration::hours(1);
    } else if *now - wall > Duration::minutes(30) {
        wall += Duration::hours(1);
    }
    wall
}
