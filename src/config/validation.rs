//! Configuration validation.
//!
//! Every check returns a [`ConfigError`]; the loader wraps it with the file
//! path. A configuration that passes here can always be turned into
//! [`CalculationParams`](crate::raw::CalculationParams).

use super::Config;
use crate::common::constants::*;
use crate::error::ConfigError;
use crate::prayer::PrayerName;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let (lat, lon) = config.coordinates()?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ConfigError::InvalidLatitude(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ConfigError::InvalidLongitude(lon));
    }

    // Resolves the explicit zone, or checks the coordinates map to one
    config.time_zone()?;

    if let Some(threshold) = config.display_threshold
        && threshold > MAXIMUM_DISPLAY_THRESHOLD
    {
        return Err(ConfigError::InvalidThreshold {
            value: threshold,
            max: MAXIMUM_DISPLAY_THRESHOLD,
        });
    }

    if let Some(days) = config.hijri_adjustment
        && !(MINIMUM_HIJRI_ADJUSTMENT..=MAXIMUM_HIJRI_ADJUSTMENT).contains(&days)
    {
        return Err(ConfigError::InvalidHijriAdjustment(days));
    }

    if let Some(seconds) = config.sync_grace_seconds
        && !(MINIMUM_SYNC_GRACE_SECONDS..=MAXIMUM_SYNC_GRACE_SECONDS).contains(&seconds)
    {
        return Err(ConfigError::InvalidSyncGrace(seconds));
    }

    if let Some(keys) = &config.not_displayed
        && let Some(unknown) = keys.iter().find(|k| PrayerName::from_key(k).is_none())
    {
        return Err(ConfigError::UnknownPrayer(unknown.clone()));
    }

    Ok(())
}
