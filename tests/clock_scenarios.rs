//! Whole nights driven through the ticker the way the daemon drives it: one
//! pulse per wall minute, then the grace lookup when one is pending.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike};
use chrono_tz::America::New_York;
use chrono_tz::Asia::Kuala_Lumpur;
use chrono_tz::Tz;
use mockall::mock;
use salatr::core::clock::{PrayerClock, Snapshot, TickOutcome};
use salatr::core::ticker::CountdownTicker;
use salatr::error::PrayerError;
use salatr::output::SnapshotSink;
use salatr::prayer::PrayerName;
use salatr::testing::{FixedTimesProvider, SPRING_DAY, builder, date};

mock! {
    Sink {}
    impl SnapshotSink for Sink {
        fn publish(&mut self, snapshot: &Snapshot) -> anyhow::Result<()>;
    }
}

fn at(tz: Tz, d: NaiveDate, h: u32, m: u32) -> DateTime<Tz> {
    tz.from_local_datetime(&d.and_hms_opt(h, m, 0).unwrap())
        .earliest()
        .unwrap()
}

fn ticker(provider: FixedTimesProvider, tz: Tz, now: DateTime<Tz>) -> CountdownTicker {
    let clock = PrayerClock::start(builder(provider, tz), now).unwrap();
    CountdownTicker::new(clock, std::time::Duration::from_secs(2))
}

/// Pulse every minute after `from` up to and including `until`. Returns
/// every transition with the snapshot that announced it.
fn run_night(
    ticker: &mut CountdownTicker,
    from: DateTime<Tz>,
    until: DateTime<Tz>,
) -> Vec<(PrayerName, Snapshot)> {
    let mut transitions = Vec::new();
    let mut now = from;
    while now < until {
        now += Duration::minutes(1);
        let mut reports = vec![ticker.on_external_tick(Some(now.minute()), now)];
        if let Some(deadline) = ticker.next_deadline() {
            reports.push(ticker.poll(deadline));
        }
        for report in reports {
            assert!(report.errors.is_empty(), "{:?}", report.errors);
            if let (Some(TickOutcome::Transitioned(prayer)), Some(snapshot)) =
                (report.outcome, report.snapshot)
            {
                transitions.push((prayer, snapshot));
            }
        }
    }
    transitions
}

#[test]
fn test_evening_through_sunrise() {
    let d = date(2024, 4, 1);
    let start = at(Kuala_Lumpur, d, 20, 42);
    let mut ticker = ticker(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur, start);

    let first = ticker.initial_snapshot();
    assert_eq!(first.current_prayer, PrayerName::Maghrib);
    assert_eq!(first.next_prayer, PrayerName::Isha);
    assert_eq!(first.minutes_remaining, 2);

    let transitions = run_night(&mut ticker, start, at(Kuala_Lumpur, date(2024, 4, 2), 6, 53));
    let order: Vec<PrayerName> = transitions.iter().map(|(p, _)| *p).collect();
    assert_eq!(
        order,
        [
            PrayerName::Isha,
            PrayerName::Midnight,
            PrayerName::Fajr,
            PrayerName::Sunrise
        ]
    );

    let (_, isha) = &transitions[0];
    assert_eq!(isha.next_prayer, PrayerName::Midnight);
    assert_eq!(isha.minutes_remaining, 268);
    assert_eq!(isha.schedule_date, d);

    // Rebuilt for the new civil date when Midnight began
    let (_, midnight) = &transitions[1];
    assert_eq!(midnight.schedule_date, date(2024, 4, 2));
    assert_eq!(midnight.next_prayer, PrayerName::Fajr);
    assert_eq!(midnight.minutes_remaining, 267);

    for (_, snapshot) in &transitions {
        assert_eq!(snapshot.hijri_date_string, "23 Ramadan 1445");
        assert!(!snapshot.schedule_stale);
    }
}

#[test]
fn test_no_rebuild_at_civil_midnight_while_isha_runs() {
    let d = date(2024, 4, 1);
    let start = at(Kuala_Lumpur, d, 23, 58);
    let mut ticker = ticker(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur, start);

    let transitions = run_night(&mut ticker, start, at(Kuala_Lumpur, date(2024, 4, 2), 0, 5));
    assert!(transitions.is_empty());
    assert_eq!(ticker.clock().state().current, PrayerName::Isha);
    assert_eq!(ticker.clock().schedule().date(), d);
}

#[test]
fn test_year_boundary() {
    let eve = date(2024, 12, 31);
    let start = at(Kuala_Lumpur, eve, 21, 0);
    let mut ticker = ticker(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur, start);

    let transitions = run_night(&mut ticker, start, at(Kuala_Lumpur, date(2025, 1, 1), 5, 40));
    let (prayer, midnight) = &transitions[0];
    assert_eq!(*prayer, PrayerName::Midnight);
    assert_eq!(midnight.schedule_date, date(2025, 1, 1));

    let (prayer, fajr) = &transitions[1];
    assert_eq!(*prayer, PrayerName::Fajr);
    assert_eq!(fajr.schedule_date, date(2025, 1, 1));
    assert_eq!(
        ticker.clock().schedule().next_fajr(),
        at(Kuala_Lumpur, date(2025, 1, 2), 5, 39)
    );
}

#[test]
fn test_countdown_across_spring_forward() {
    // Clocks jump from 02:00 to 03:00 on 10 March 2024
    let day = ["05:10", "06:30", "13:05", "16:20", "18:50", "20:05", "00:40"];
    let d = date(2024, 3, 10);
    let start = at(New_York, d, 0, 45);
    let mut ticker = ticker(FixedTimesProvider::new(day), New_York, start);

    let state = ticker.clock().state();
    assert_eq!(state.current, PrayerName::Midnight);
    // 00:45 EST to 05:10 EDT is three hours and 25 minutes of real time
    assert_eq!(state.minutes_remaining, 205);

    let transitions = run_night(&mut ticker, start, start + Duration::minutes(206));
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].0, PrayerName::Fajr);
    assert_eq!(transitions[0].1.minutes_remaining, 80);
}

#[test]
fn test_resume_after_overnight_suspend() {
    let d = date(2024, 4, 1);
    let mut ticker = ticker(
        FixedTimesProvider::new(SPRING_DAY),
        Kuala_Lumpur,
        at(Kuala_Lumpur, d, 21, 0),
    );
    ticker.initial_snapshot();

    let resumed = at(Kuala_Lumpur, date(2024, 4, 2), 9, 0);
    let report = ticker.on_external_tick(Some(0), resumed);
    assert!(
        report
            .errors
            .iter()
            .any(|e| matches!(e, PrayerError::ClockSkewDetected { .. }))
    );

    let snapshot = report.snapshot.unwrap();
    assert_eq!(snapshot.current_prayer, PrayerName::Sunrise);
    assert_eq!(snapshot.next_prayer, PrayerName::Dhuhr);
    assert_eq!(snapshot.minutes_remaining, 251);
    assert_eq!(snapshot.schedule_date, date(2024, 4, 2));
}

#[test]
fn test_repeated_pulse_is_not_painted_twice() {
    let d = date(2024, 4, 1);
    let start = at(Kuala_Lumpur, d, 14, 0);
    let mut ticker = ticker(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur, start);

    let mut sink = MockSink::new();
    sink.expect_publish()
        .withf(|s| s.current_prayer == PrayerName::Dhuhr)
        .times(3)
        .returning(|_| Ok(()));

    sink.publish(&ticker.initial_snapshot()).unwrap();
    for minute in [1, 1, 2] {
        let now = at(Kuala_Lumpur, d, 14, minute);
        if let Some(snapshot) = ticker.on_external_tick(Some(minute), now).snapshot {
            sink.publish(&snapshot).unwrap();
        }
    }
    assert_eq!(ticker.clock().state().minutes_remaining, 164);
}
