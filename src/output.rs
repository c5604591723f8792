//! Where snapshots go.
//!
//! The rendering side is anything that implements [`SnapshotSink`]. Two are
//! built in: the structured terminal log, and newline-delimited JSON for
//! status bars and widgets that want to paint the state themselves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;

use crate::common::utils::format_countdown;
use crate::core::clock::Snapshot;
use crate::prayer::PrayerName;

/// Renderer selected in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Log,
    Json,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Log => "log",
            OutputMode::Json => "json",
        }
    }
}

/// Receives every snapshot the ticker emits.
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Renders through the structured logger.
pub struct LogSink {
    hidden: BTreeSet<PrayerName>,
    threshold_minutes: u32,
    last: Option<Snapshot>,
}

impl LogSink {
    pub fn new(hidden: impl IntoIterator<Item = PrayerName>, threshold_minutes: u32) -> Self {
        Self {
            hidden: hidden.into_iter().collect(),
            threshold_minutes,
            last: None,
        }
    }

    /// Full table when the schedule or the current prayer changed.
    fn needs_table(&self, snapshot: &Snapshot) -> bool {
        match &self.last {
            None => true,
            Some(last) => {
                last.current_prayer != snapshot.current_prayer
                    || last.schedule_date != snapshot.schedule_date
                    || last.prayer_time_strings != snapshot.prayer_time_strings
                    || last.schedule_stale != snapshot.schedule_stale
            }
        }
    }

    fn countdown_line(&self, snapshot: &Snapshot) -> String {
        let line = format!(
            "{} in {}",
            snapshot.next_prayer,
            format_countdown(i64::from(snapshot.minutes_remaining))
        );
        if snapshot.minutes_remaining <= self.threshold_minutes {
            format!("{line} (soon)")
        } else {
            line
        }
    }

    fn table_rows(&self, snapshot: &Snapshot) -> Vec<String> {
        PrayerName::ALL
            .into_iter()
            .filter(|prayer| !self.hidden.contains(prayer) || *prayer == snapshot.current_prayer)
            .filter_map(|prayer| {
                let time = snapshot.prayer_time_strings.get(&prayer)?;
                let marker = if prayer == snapshot.current_prayer {
                    "●"
                } else if prayer == snapshot.next_prayer {
                    "→"
                } else {
                    " "
                };
                Some(format!("{marker} {:<9}{time}", prayer.display_name()))
            })
            .collect()
    }
}

impl SnapshotSink for LogSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.needs_table(snapshot) {
            log_block_start!("{} ({})", snapshot.current_prayer, snapshot.hijri_date_string);
            for row in self.table_rows(snapshot) {
                log_indented!("{}", row);
            }
            if snapshot.schedule_stale {
                log_indented!("Schedule is out of date, retrying every minute");
            }
        }
        log_decorated!("{}", self.countdown_line(snapshot));
        self.last = Some(snapshot.clone());
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for JsonSink<W> {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot).context("Failed to encode snapshot")?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .context("Failed to write snapshot")
    }
}
