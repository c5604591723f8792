//! Default configuration file.
//!
//! The file is written once, on first run, with every setting present and
//! commented. The coordinates are left commented out so the first start
//! stops with a pointer to this file instead of computing times for a
//! made-up place.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::common::constants::*;

/// Write the default config to `path`, creating its directory.
///
/// Written to a temporary file in the same directory and renamed into place,
/// so a crash never leaves a half-written config behind.
pub fn create_default_config(path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .context("Config path has no parent directory")?;
    fs::create_dir_all(dir).context("Failed to create config directory")?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .context("Failed to create temporary config file")?;
    temp.write_all(default_config_content().as_bytes())
        .context("Failed to write default config")?;
    temp.persist(path)
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    let hidden = DEFAULT_NOT_DISPLAYED
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut content = ConfigBuilder::new()
        .add_section("Location")
        .add_commented_setting("latitude", "21.422500", "Geographic latitude (-90 to 90)")
        .add_commented_setting("longitude", "39.826200", "Geographic longitude (-180 to 180)")
        .add_commented_setting(
            "time_zone",
            "\"Asia/Riyadh\"",
            "IANA time zone (derived from the coordinates when omitted)",
        )
        .add_section("Calculation")
        .add_setting(
            "method",
            &format!("\"{}\"", DEFAULT_METHOD.as_str()),
            "mwl, isna, egypt, makkah, karachi, tehran or jafari",
        )
        .add_setting(
            "asr_factor",
            &format!("\"{}\"", DEFAULT_ASR_FACTOR.as_str()),
            "standard (shadow = length) or hanafi (shadow = 2x length)",
        )
        .add_setting(
            "hijri_adjustment",
            &DEFAULT_HIJRI_ADJUSTMENT.to_string(),
            &format!(
                "Days added to the Hijri date ({MINIMUM_HIJRI_ADJUSTMENT} to {MAXIMUM_HIJRI_ADJUSTMENT})"
            ),
        )
        .add_commented_setting(
            "schedule_file",
            "\"timetable.json\"",
            "Published timetable to use instead of computed times",
        )
        .add_section("Display")
        .add_setting(
            "time_format",
            &DEFAULT_TIME_FORMAT.hours().to_string(),
            "12 or 24 hour clock",
        )
        .add_setting(
            "language",
            &format!("\"{DEFAULT_LANGUAGE}\""),
            "Hijri month names: en, ar, ms, id, tr, fr",
        )
        .add_setting(
            "display_threshold",
            &DEFAULT_DISPLAY_THRESHOLD.to_string(),
            &format!("Minutes before a prayer shown as imminent (0-{MAXIMUM_DISPLAY_THRESHOLD})"),
        )
        .add_setting(
            "not_displayed",
            &format!("[{hidden}]"),
            "Entries left out of the schedule table",
        )
        .add_setting(
            "output",
            &format!("\"{}\"", DEFAULT_OUTPUT.as_str()),
            "log (terminal) or json (one object per line)",
        )
        .add_section("Timing")
        .add_setting(
            "sync_grace_seconds",
            &DEFAULT_SYNC_GRACE_SECONDS.to_string(),
            &format!(
                "Wait after a countdown ends before switching ({MINIMUM_SYNC_GRACE_SECONDS}-{MAXIMUM_SYNC_GRACE_SECONDS})"
            ),
        )
        .build();
    content.push('\n');
    content
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting shown as an example but not active.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("#{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// Settings with their comments aligned one space past the longest line.
    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }
        result.join("\n")
    }
}
