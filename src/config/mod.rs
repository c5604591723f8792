//! Configuration for salatr.
//!
//! Settings live in `salatr.toml`, looked up in `$XDG_CONFIG_HOME/salatr/` or
//! in the directory passed with `--config`. Every field is optional in the
//! file and falls back to a default from `common::constants`, except the
//! coordinates: without them nothing can be computed and loading fails.
//!
//! ```toml
//! #[Location]
//! latitude = 3.139               # Geographic latitude (-90 to 90)
//! longitude = 101.6869           # Geographic longitude (-180 to 180)
//! time_zone = "Asia/Kuala_Lumpur" # IANA zone; derived from the coordinates when omitted
//!
//! #[Calculation]
//! method = "mwl"                 # mwl, isna, egypt, makkah, karachi, tehran, jafari
//! asr_factor = "standard"        # standard or hanafi
//! hijri_adjustment = 0           # Days added to the Hijri date (-2 to 2)
//!
//! #[Display]
//! time_format = 24               # 12 or 24
//! language = "en"                # Hijri month names: en, ar, ms, id, tr, fr
//! display_threshold = 10         # Minutes before a prayer counted as imminent
//! not_displayed = ["sunrise", "midnight"]
//! output = "log"                 # log or json
//! ```
//!
//! Coordinates may also live in a `geo.toml` next to the main file, so the
//! main file can be shared without revealing a location. Values there win.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use anyhow::Result;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::error::ConfigError;
use crate::output::OutputMode;
use crate::prayer::{PrayerName, TimeFormat};
use crate::raw::{AsrFactor, CalculationMethod, CalculationParams};

pub use builder::create_default_config;
pub use loading::{
    get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir,
    timezone_from_coordinates,
};
pub use watcher::start_config_watcher;

/// Private coordinates stored in `geo.toml`.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct GeoConfig {
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) time_zone: Option<String>,
}

/// Settings read from `salatr.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// IANA zone name. Filled in from the coordinates while loading.
    pub time_zone: Option<String>,

    pub method: Option<CalculationMethod>,
    pub asr_factor: Option<AsrFactor>,
    /// Days added to every Hijri conversion to follow local moon sighting.
    pub hijri_adjustment: Option<i64>,
    /// Read times from a published timetable instead of computing them.
    /// Relative paths are resolved against the config directory.
    pub schedule_file: Option<PathBuf>,

    pub time_format: Option<TimeFormat>,
    pub language: Option<String>,
    pub display_threshold: Option<u32>, // minutes
    pub not_displayed: Option<Vec<String>>,
    pub output: Option<OutputMode>,

    /// Delay between a countdown reaching zero and the schedule lookup.
    pub sync_grace_seconds: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    /// Path of `geo.toml`, in the same directory as `salatr.toml`.
    pub fn get_geo_path() -> Result<PathBuf> {
        Ok(loading::get_config_base_dir()?.join("geo.toml"))
    }

    pub fn coordinates(&self) -> Result<(f64, f64), ConfigError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(ConfigError::MissingCoordinates),
        }
    }

    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        match &self.time_zone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::UnknownTimeZone(name.clone())),
            None => {
                let (lat, lon) = self.coordinates()?;
                timezone_from_coordinates(lat, lon)
                    .ok_or_else(|| ConfigError::UnknownTimeZone(format!("{lat:.4}, {lon:.4}")))
            }
        }
    }

    pub fn calculation_params(&self) -> Result<CalculationParams, ConfigError> {
        let (latitude, longitude) = self.coordinates()?;
        Ok(CalculationParams {
            latitude,
            longitude,
            time_zone: self.time_zone()?,
            method: self.method(),
            asr_factor: self.asr_factor(),
        })
    }

    pub fn method(&self) -> CalculationMethod {
        self.method.unwrap_or(DEFAULT_METHOD)
    }

    pub fn asr_factor(&self) -> AsrFactor {
        self.asr_factor.unwrap_or(DEFAULT_ASR_FACTOR)
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format.unwrap_or(DEFAULT_TIME_FORMAT)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn display_threshold(&self) -> u32 {
        self.display_threshold.unwrap_or(DEFAULT_DISPLAY_THRESHOLD)
    }

    pub fn output(&self) -> OutputMode {
        self.output.unwrap_or(DEFAULT_OUTPUT)
    }

    pub fn hijri_adjustment(&self) -> i64 {
        self.hijri_adjustment.unwrap_or(DEFAULT_HIJRI_ADJUSTMENT)
    }

    pub fn sync_grace(&self) -> Duration {
        Duration::from_secs(self.sync_grace_seconds.unwrap_or(DEFAULT_SYNC_GRACE_SECONDS))
    }

    /// Entries the log renderer leaves out of its table. Unknown keys were
    /// rejected by validation.
    pub fn hidden_prayers(&self) -> Vec<PrayerName> {
        match &self.not_displayed {
            Some(keys) => keys.iter().filter_map(|k| PrayerName::from_key(k)).collect(),
            None => DEFAULT_NOT_DISPLAYED
                .iter()
                .filter_map(|k| PrayerName::from_key(k))
                .collect(),
        }
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");

        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            let lat_dir = if lat >= 0.0 { "N" } else { "S" };
            let lon_dir = if lon >= 0.0 { "E" } else { "W" };
            log_indented!(
                "Location: {:.3}°{}, {:.3}°{}",
                lat.abs(),
                lat_dir,
                lon.abs(),
                lon_dir
            );
            if let Ok(geo_path) = Self::get_geo_path()
                && geo_path.exists()
            {
                log_indented!("Coordinates overridden by {}", private_path(&geo_path));
            }
        }
        if let Some(ref tz) = self.time_zone {
            log_indented!("Time zone: {}", tz);
        }

        match &self.schedule_file {
            Some(path) => log_indented!("Times: timetable {}", private_path(path)),
            None => log_indented!(
                "Method: {} ({}), Asr {}",
                self.method().display_name(),
                self.method(),
                self.asr_factor().as_str()
            ),
        }
        log_indented!(
            "Display: {}, language {}, output {}",
            self.time_format(),
            self.language(),
            self.output().as_str()
        );
        if self.hijri_adjustment() != 0 {
            log_indented!("Hijri adjustment: {:+} day(s)", self.hijri_adjustment());
        }
    }
}

#[cfg(test)]
mod tests;
