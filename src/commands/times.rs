//! `salatr times [DATE]`: print one built schedule and exit.
//!
//! Goes through the same builder as the daemon, so it doubles as a check of
//! the configuration and of a timetable file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::common::utils::format_countdown;
use crate::config::Config;
use crate::output::OutputMode;
use crate::schedule::{DaySchedule, DayScheduleBuilder};
use crate::time::source;

pub fn handle_times_command(date: Option<&str>, debug_enabled: bool) -> Result<()> {
    let config = Config::load()?;
    let builder = DayScheduleBuilder::from_config(&config)?;
    let tz = builder.time_zone();

    let date = match date {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{text}'. Use YYYY-MM-DD"))?,
        None => source::now_in(tz).date_naive(),
    };

    let schedule = builder
        .build(date)
        .with_context(|| format!("Failed to build the prayer schedule for {date}"))?;

    if config.output() == OutputMode::Json {
        println!("{}", schedule_json(&schedule));
        return Ok(());
    }

    log_version!();
    if debug_enabled {
        config.log_config();
    }
    log_block_start!(
        "{} ({}, {} provider)",
        date.format("%A %Y-%m-%d"),
        tz,
        builder.provider_name()
    );
    for row in schedule_rows(&schedule) {
        log_indented!("{}", row);
    }
    if let Some(warning) = builder.hijri().locale_warning() {
        log_pipe!();
        log_warning!("{warning}");
    }
    log_end!();
    Ok(())
}

/// Previous Midnight, the seven instants, then the following Fajr.
pub(crate) fn schedule_rows(schedule: &DaySchedule) -> Vec<String> {
    let previous = schedule.previous_midnight();
    let mut rows = vec![format!(
        "{:<9}{}  {:>7}  {}",
        "Midnight",
        previous.time.format("%m-%d %H:%M"),
        "",
        previous.hijri_label
    )];

    rows.extend(schedule.instants().iter().map(|instant| {
        let shown = schedule
            .time_strings()
            .get(&instant.name)
            .cloned()
            .unwrap_or_default();
        format!(
            "{:<9}{:<11}  {:>7}  {}",
            instant.name.display_name(),
            shown,
            format_countdown(instant.minutes_until_next),
            instant.hijri_label
        )
    }));

    rows.push(format!(
        "{:<9}{}",
        "Fajr",
        schedule.next_fajr().format("%m-%d %H:%M")
    ));
    rows
}

pub(crate) fn schedule_json(schedule: &DaySchedule) -> Value {
    let previous = schedule.previous_midnight();
    let prayers: Vec<Value> = schedule
        .instants()
        .iter()
        .map(|instant| {
            json!({
                "name": instant.name.key(),
                "display": schedule.time_strings().get(&instant.name),
                "time": instant.time.to_rfc3339(),
                "minutesUntilNext": instant.minutes_until_next,
                "hijriDate": instant.hijri_label,
            })
        })
        .collect();

    json!({
        "date": schedule.date().to_string(),
        "previousMidnight": {
            "time": previous.time.to_rfc3339(),
            "hijriDate": previous.hijri_label,
        },
        "prayers": prayers,
        "nextFajr": schedule.next_fajr().to_rfc3339(),
    })
}

/// Shown by `salatr help times`.
pub fn display_help() {
    log_version!();
    log_block_start!("times - Print the prayer schedule for one day");
    log_block_start!("Usage: salatr times [DATE]");
    log_block_start!("Arguments:");
    log_indented!("DATE  Civil date as YYYY-MM-DD (default: today in the configured zone)");
    log_block_start!("Output:");
    log_indented!("Each entry with its time, the time until the next entry,");
    log_indented!("and its Hijri date. With output = \"json\" one JSON object is printed.");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedTimesProvider, SPRING_DAY, builder, date};
    use chrono_tz::Asia::Kuala_Lumpur;

    fn spring_schedule() -> DaySchedule {
        builder(FixedTimesProvider::new(SPRING_DAY), Kuala_Lumpur)
            .build(date(2024, 4, 1))
            .unwrap()
    }

    #[test]
    fn test_rows_cover_the_whole_night() {
        let rows = schedule_rows(&spring_schedule());
        assert_eq!(rows.len(), 9);
        assert!(rows[0].starts_with("Midnight 04-01 01:12"));
        assert!(rows[1].starts_with("Fajr     05:39"));
        assert!(rows[1].contains("1h 13m"));
        assert!(rows[5].contains("23 Ramadan 1445"));
        assert_eq!(rows[8], "Fajr     04-02 05:39");
    }

    #[test]
    fn test_json_shape() {
        let value = schedule_json(&spring_schedule());
        assert_eq!(value["date"], "2024-04-01");
        assert_eq!(value["prayers"].as_array().map(Vec::len), Some(7));
        assert_eq!(value["prayers"][0]["name"], "fajr");
        assert_eq!(value["prayers"][0]["display"], "05:39");
        assert_eq!(value["prayers"][0]["minutesUntilNext"], 73);
        assert_eq!(value["prayers"][6]["time"], "2024-04-02T01:12:00+08:00");
        assert_eq!(value["nextFajr"], "2024-04-02T05:39:00+08:00");
        assert_eq!(value["previousMidnight"]["time"], "2024-04-01T01:12:00+08:00");
    }
}
