//! Configuration loading.
//!
//! Finds the config file, applies the `geo.toml` override, validates, and
//! fills in derived values (time zone from coordinates, timetable path).

use anyhow::{Context, Result};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::validation::validate_config;
use super::{Config, GeoConfig};
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Configuration directory set once at startup by `--config`.
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

static TZ_FINDER: Lazy<tzf_rs::DefaultFinder> = Lazy::new(tzf_rs::DefaultFinder::new);

/// Set the configuration directory for this process. Errors if already set.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The directory given with `--config`, if any.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Directory holding `salatr.toml` and `geo.toml`.
pub fn get_config_base_dir() -> Result<PathBuf> {
    let config_path = get_config_path()?;
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// IANA zone containing the coordinates.
pub fn timezone_from_coordinates(latitude: f64, longitude: f64) -> Option<Tz> {
    TZ_FINDER.get_tz_name(longitude, latitude).parse().ok()
}

/// Load the configuration, writing a commented default file first if none
/// exists yet.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
        log_block_start!("Created default configuration");
        log_indented!("{}", private_path(&config_path));
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load from a specific path. Never creates a file.
pub fn load_from_path(path: &PathBuf) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    // Before validation so geo.toml values are validated too
    load_geo_override_from_path(&mut config, path)?;

    validate_config(&config)?;

    apply_derived_values(&mut config, path);

    Ok(config)
}

/// Fill in values that depend on other fields or on the file's location.
pub(crate) fn apply_derived_values(config: &mut Config, config_path: &Path) {
    if config.time_zone.is_none()
        && let (Some(lat), Some(lon)) = (config.latitude, config.longitude)
        && let Some(tz) = timezone_from_coordinates(lat, lon)
    {
        config.time_zone = Some(tz.name().to_string());
    }

    if let Some(schedule) = config.schedule_file.take() {
        config.schedule_file = Some(resolve_relative(&schedule, config_path));
    }
}

/// `~/` expands to the home directory, relative paths hang off the config
/// directory.
fn resolve_relative(path: &Path, config_path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

/// Apply `geo.toml` from the directory of `config_path`, if present.
/// A broken `geo.toml` is reported and ignored.
pub(crate) fn load_geo_override_from_path(config: &mut Config, config_path: &Path) -> Result<()> {
    let Some(parent) = config_path.parent() else {
        return Ok(());
    };
    let geo_path = parent.join("geo.toml");
    if !geo_path.exists() {
        return Ok(());
    }

    match fs::read_to_string(&geo_path) {
        Ok(content) => match toml::from_str::<GeoConfig>(&content) {
            Ok(geo) => {
                if let Some(lat) = geo.latitude {
                    config.latitude = Some(lat);
                }
                if let Some(lon) = geo.longitude {
                    config.longitude = Some(lon);
                }
                if let Some(tz) = geo.time_zone {
                    config.time_zone = Some(tz);
                }
            }
            Err(e) => {
                log_warning!("Failed to parse geo.toml: {e}. Using coordinates from main config.");
            }
        },
        Err(e) => {
            log_warning!("Failed to read geo.toml: {e}. Using coordinates from main config.");
        }
    }

    Ok(())
}
