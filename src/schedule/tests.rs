use super::*;
use crate::raw::MockRawTimeProvider;
use crate::testing::{FixedTimesProvider, SPRING_DAY, builder, date, params, raw_times};
use anyhow::anyhow;
use chrono::Utc;
use chrono_tz::Asia::Kuala_Lumpur;
use chrono_tz::America::New_York;

fn at(tz: Tz, d: NaiveDate, h: u32, m: u32) -> DateTime<Tz> {
    tz.from_local_datetime(&d.and_hms_opt(h, m, 0).unwrap())
        .unwrap()
}

#[test]
fn test_spring_day_anchors_midnight_on_next_date() {
    let schedule = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();

    assert_eq!(schedule.date(), date(2024, 4, 1));
    assert_eq!(
        schedule.instant(PrayerName::Fajr).time,
        at(Kuala_Lumpur, date(2024, 4, 1), 5, 39)
    );
    assert_eq!(
        schedule.instant(PrayerName::Midnight).time,
        at(Kuala_Lumpur, date(2024, 4, 2), 1, 12)
    );
    assert_eq!(schedule.next_fajr(), at(Kuala_Lumpur, date(2024, 4, 2), 5, 39));
    assert_eq!(
        schedule.previous_midnight().time,
        at(Kuala_Lumpur, date(2024, 4, 1), 1, 12)
    );
}

#[test]
fn test_deltas_chain_into_next_day() {
    let schedule = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();

    let deltas: Vec<i64> = schedule
        .instants()
        .iter()
        .map(|i| i.minutes_until_next)
        .collect();
    assert_eq!(deltas, vec![73, 379, 215, 165, 73, 268, 267]);
    assert_eq!(schedule.previous_midnight().minutes_until_next, 267);
    assert_eq!(
        schedule.end_of(PrayerName::Midnight),
        schedule.next_fajr()
    );
}

#[test]
fn test_midnight_uses_following_day_fajr() {
    let provider = FixedTimesProvider::new(SPRING_DAY).with_day(
        date(2024, 4, 2),
        ["05:30", "06:52", "13:11", "16:46", "19:31", "20:44", "01:12"],
    );
    let schedule = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();
    assert_eq!(
        schedule.instant(PrayerName::Midnight).minutes_until_next,
        258
    );
}

#[test]
fn test_midnight_before_civil_midnight_stays_on_date() {
    let day = ["05:39", "06:52", "13:11", "16:46", "19:31", "20:44", "23:48"];
    let schedule = builder(FixedTimesProvider::new(day), Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();
    assert_eq!(
        schedule.instant(PrayerName::Midnight).time,
        at(Kuala_Lumpur, date(2024, 4, 1), 23, 48)
    );
    assert_eq!(schedule.instant(PrayerName::Midnight).minutes_until_next, 351);
}

#[test]
fn test_hijri_labels_advance_at_maghrib() {
    let schedule = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();

    for prayer in [PrayerName::Fajr, PrayerName::Sunrise, PrayerName::Dhuhr, PrayerName::Asr] {
        assert_eq!(schedule.instant(prayer).hijri_label, "22 Ramadan 1445");
    }
    for prayer in [PrayerName::Maghrib, PrayerName::Isha, PrayerName::Midnight] {
        assert_eq!(schedule.instant(prayer).hijri_label, "23 Ramadan 1445");
    }
    assert_eq!(schedule.previous_midnight().hijri_label, "22 Ramadan 1445");
}

#[test]
fn test_time_strings_use_display_format() {
    let b = DayScheduleBuilder::new(
        Box::new(FixedTimesProvider::new(SPRING_DAY)),
        params(Kuala_Lumpur),
        HijriDateResolver::new("en", 0),
        TimeFormat::H12,
    );
    let schedule = b.build(date(2024, 4, 1)).unwrap();
    assert_eq!(schedule.time_strings()[&PrayerName::Isha], "8:44 PM");
    assert_eq!(schedule.time_strings()[&PrayerName::Midnight], "1:12 AM");
}

#[test]
fn test_twelve_hour_provider_strings() {
    let mut mock = MockRawTimeProvider::new();
    mock.expect_raw_times().returning(|_, _| {
        Ok(raw_times([
            "5:39 AM", "6:52 AM", "1:11 PM", "4:46 PM", "7:31 PM", "8:44 PM", "1:12 AM",
        ]))
    });
    mock.expect_time_format().return_const(TimeFormat::H12);
    mock.expect_name().return_const("mock");

    let b = DayScheduleBuilder::new(
        Box::new(mock),
        params(Kuala_Lumpur),
        HijriDateResolver::new("en", 0),
        TimeFormat::H24,
    );
    let schedule = b.build(date(2024, 4, 1)).unwrap();
    assert_eq!(schedule.time_strings()[&PrayerName::Dhuhr], "13:11");
    assert_eq!(
        schedule.instant(PrayerName::Midnight).time,
        at(Kuala_Lumpur, date(2024, 4, 2), 1, 12)
    );
}

#[test]
fn test_provider_failure_is_reported_with_date() {
    let mut mock = MockRawTimeProvider::new();
    mock.expect_raw_times()
        .returning(|_, _| Err(anyhow!("timetable offline")));
    mock.expect_time_format().return_const(TimeFormat::H24);

    let b = DayScheduleBuilder::new(
        Box::new(mock),
        params(Kuala_Lumpur),
        HijriDateResolver::new("en", 0),
        TimeFormat::H24,
    );
    let err = b.build(date(2024, 4, 1)).unwrap_err();
    assert_eq!(
        err,
        ScheduleBuildError::Provider {
            date: date(2024, 4, 1),
            message: "timetable offline".to_string()
        }
    );
    assert_eq!(err.field(), None);
}

#[test]
fn test_missing_field() {
    let mut raw = raw_times(SPRING_DAY);
    raw.remove("asr");
    let provider = FixedTimesProvider::new(SPRING_DAY).with_raw_day(date(2024, 4, 1), raw);
    let err = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleBuildError::MissingField {
            date: date(2024, 4, 1),
            field: PrayerName::Asr
        }
    );
}

#[test]
fn test_unparseable_field() {
    let provider = FixedTimesProvider::new(SPRING_DAY).with_day(
        date(2024, 4, 1),
        ["05:39", "06:52", "13:11", "16:46", "19:31", "8:44 PM", "01:12"],
    );
    let err = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap_err();
    assert_eq!(err.field(), Some(PrayerName::Isha));
    assert!(matches!(err, ScheduleBuildError::InvalidTime { .. }));
}

#[test]
fn test_out_of_order_names_offending_field() {
    let provider = FixedTimesProvider::new(SPRING_DAY).with_day(
        date(2024, 4, 1),
        ["05:39", "06:52", "13:11", "16:46", "19:31", "19:31", "01:12"],
    );
    let err = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleBuildError::OutOfOrder {
            date: date(2024, 4, 1),
            field: PrayerName::Isha
        }
    );
}

#[test]
fn test_afternoon_midnight_before_isha_is_rejected() {
    // One day later 20:30 would fall after the next Fajr, so no anchor fits
    let provider = FixedTimesProvider::new(SPRING_DAY).with_day(
        date(2024, 4, 1),
        ["05:39", "06:52", "13:11", "16:46", "19:31", "20:44", "20:30"],
    );
    let err = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleBuildError::OutOfOrder {
            date: date(2024, 4, 1),
            field: PrayerName::Midnight
        }
    );
}

#[test]
fn test_neighbour_day_failure_blocks_build() {
    let mut raw = raw_times(SPRING_DAY);
    raw.remove("fajr");
    let provider = FixedTimesProvider::new(SPRING_DAY).with_raw_day(date(2024, 4, 2), raw);
    let err = builder(provider, Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap_err();
    assert_eq!(err.date(), date(2024, 4, 2));
}

#[test]
fn test_locate_boundaries() {
    let schedule = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur)
        .build(date(2024, 4, 1))
        .unwrap();

    let d = date(2024, 4, 1);
    assert_eq!(schedule.locate(&at(Kuala_Lumpur, d, 5, 38)), None);
    assert_eq!(schedule.locate(&at(Kuala_Lumpur, d, 5, 39)), Some(PrayerName::Fajr));
    assert_eq!(schedule.locate(&at(Kuala_Lumpur, d, 20, 42)), Some(PrayerName::Maghrib));
    assert_eq!(
        schedule.locate(&at(Kuala_Lumpur, date(2024, 4, 2), 1, 15)),
        Some(PrayerName::Midnight)
    );
    // Comparison is by instant, not by zone
    let utc = at(Kuala_Lumpur, d, 13, 11).with_timezone(&Utc);
    assert_eq!(schedule.locate(&utc), Some(PrayerName::Dhuhr));
}

#[test]
fn test_spring_forward_gap_moves_later() {
    // 02:30 does not exist in New York on 2024-03-10
    let provider = FixedTimesProvider::new(SPRING_DAY).with_day(
        date(2024, 3, 10),
        ["02:30", "07:17", "13:14", "16:35", "19:08", "20:23", "01:12"],
    );
    let schedule = builder(provider, New_York).build(date(2024, 3, 10)).unwrap();
    assert_eq!(
        schedule.instant(PrayerName::Fajr).time,
        at(New_York, date(2024, 3, 10), 3, 30)
    );
    // Midnight 01:12 of the day before sits before the gap
    assert_eq!(
        schedule.previous_midnight().time,
        at(New_York, date(2024, 3, 10), 1, 12)
    );
}

#[test]
fn test_fall_back_overlap_takes_earliest() {
    // 01:12 occurs twice in New York on 2024-11-03
    let schedule = builder(FixedTimesProvider::new(SPRING_DAY), New_York)
        .build(date(2024, 11, 2))
        .unwrap();
    let midnight = schedule.instant(PrayerName::Midnight).time;
    assert_eq!(midnight.with_timezone(&Utc).to_rfc3339(), "2024-11-03T05:12:00+00:00");
    // Extra hour of the night is counted
    assert_eq!(schedule.instant(PrayerName::Midnight).minutes_until_next, 327);
}

#[test]
fn test_build_is_pure() {
    let b = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur);
    assert_eq!(b.build(date(2024, 4, 1)), b.build(date(2024, 4, 1)));
}

#[test]
fn test_year_boundary() {
    let b = builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur);
    let december = b.build(date(2024, 12, 31)).unwrap();
    let january = b.build(date(2025, 1, 1)).unwrap();

    assert_eq!(december.next_fajr(), january.instant(PrayerName::Fajr).time);
    assert_eq!(
        december.instant(PrayerName::Maghrib).hijri_label,
        january.instant(PrayerName::Fajr).hijri_label
    );
    assert_eq!(december.instant(PrayerName::Asr).hijri_label, "29 Jumada al-Thani 1446");
    assert_eq!(december.instant(PrayerName::Maghrib).hijri_label, "1 Rajab 1446");
}
