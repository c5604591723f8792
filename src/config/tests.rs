use super::validation::validate_config;
use super::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn kuala_lumpur() -> Config {
    Config {
        latitude: Some(3.139),
        longitude: Some(101.6869),
        time_zone: Some("Asia/Kuala_Lumpur".to_string()),
        ..Config::default()
    }
}

fn write_config(dir: &std::path::Path, content: &str) -> PathBuf {
    let path = dir.join(CONFIG_FILE_NAME);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_defaults_apply_to_missing_fields() {
    let config = kuala_lumpur();
    assert_eq!(config.method(), CalculationMethod::Isna);
    assert_eq!(config.asr_factor(), AsrFactor::Standard);
    assert_eq!(config.time_format(), TimeFormat::H24);
    assert_eq!(config.language(), "en");
    assert_eq!(config.display_threshold(), 10);
    assert_eq!(config.output(), OutputMode::Log);
    assert_eq!(config.sync_grace(), Duration::from_secs(2));
    assert_eq!(
        config.hidden_prayers(),
        vec![PrayerName::Sunrise, PrayerName::Midnight]
    );
}

#[test]
fn test_validation_requires_coordinates() {
    let config = Config {
        latitude: Some(3.139),
        ..Config::default()
    };
    assert_eq!(validate_config(&config), Err(ConfigError::MissingCoordinates));
    assert!(config.calculation_params().is_err());
}

#[test]
fn test_validation_ranges() {
    let mut config = kuala_lumpur();
    assert_eq!(validate_config(&config), Ok(()));

    config.latitude = Some(91.0);
    assert_eq!(validate_config(&config), Err(ConfigError::InvalidLatitude(91.0)));
    config.latitude = Some(3.139);

    config.longitude = Some(-181.0);
    assert_eq!(
        validate_config(&config),
        Err(ConfigError::InvalidLongitude(-181.0))
    );
    config.longitude = Some(101.6869);

    config.display_threshold = Some(721);
    assert!(matches!(
        validate_config(&config),
        Err(ConfigError::InvalidThreshold { value: 721, .. })
    ));
    config.display_threshold = Some(0);

    config.hijri_adjustment = Some(3);
    assert_eq!(
        validate_config(&config),
        Err(ConfigError::InvalidHijriAdjustment(3))
    );
    config.hijri_adjustment = Some(-2);

    config.sync_grace_seconds = Some(0);
    assert_eq!(validate_config(&config), Err(ConfigError::InvalidSyncGrace(0)));
    config.sync_grace_seconds = Some(30);

    config.not_displayed = Some(vec!["sunrise".to_string(), "duha".to_string()]);
    assert_eq!(
        validate_config(&config),
        Err(ConfigError::UnknownPrayer("duha".to_string()))
    );
    config.not_displayed = Some(vec![]);

    config.time_zone = Some("Mars/Olympus_Mons".to_string());
    assert_eq!(
        validate_config(&config),
        Err(ConfigError::UnknownTimeZone("Mars/Olympus_Mons".to_string()))
    );
}

#[test]
fn test_time_zone_from_coordinates() {
    let config = Config {
        latitude: Some(21.4225),
        longitude: Some(39.8262),
        ..Config::default()
    };
    assert_eq!(config.time_zone(), Ok(chrono_tz::Asia::Riyadh));
}

#[test]
fn test_load_from_path_parses_every_field() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
latitude = 43.6532
longitude = -79.3832
time_zone = "America/Toronto"
method = "karachi"
asr_factor = "hanafi"
hijri_adjustment = -1
schedule_file = "toronto.json"
time_format = 12
language = "ar"
display_threshold = 15
not_displayed = ["midnight"]
output = "json"
sync_grace_seconds = 5
"#,
    );

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.method(), CalculationMethod::Karachi);
    assert_eq!(config.asr_factor(), AsrFactor::Hanafi);
    assert_eq!(config.hijri_adjustment(), -1);
    assert_eq!(config.time_format(), TimeFormat::H12);
    assert_eq!(config.language(), "ar");
    assert_eq!(config.display_threshold(), 15);
    assert_eq!(config.hidden_prayers(), vec![PrayerName::Midnight]);
    assert_eq!(config.output(), OutputMode::Json);
    assert_eq!(config.sync_grace(), Duration::from_secs(5));
    // Relative timetable paths hang off the config directory
    assert_eq!(config.schedule_file, Some(dir.path().join("toronto.json")));
}

#[test]
fn test_load_fills_time_zone() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "latitude = 3.139\nlongitude = 101.6869\n");
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.time_zone.as_deref(), Some("Asia/Kuala_Lumpur"));
}

#[test]
fn test_invalid_time_format_is_rejected() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "latitude = 3.139\nlongitude = 101.6869\ntime_format = 13\n",
    );
    let err = load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("time_format must be 12 or 24"));
}

#[test]
fn test_missing_coordinates_fail_fast() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "method = \"mwl\"\n");
    let err = load_from_path(&path).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MissingCoordinates)
    );
}

#[test]
fn test_geo_toml_overrides_coordinates() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "latitude = 0.0\nlongitude = 0.0\n");
    fs::write(
        dir.path().join("geo.toml"),
        "latitude = 21.4225\nlongitude = 39.8262\ntime_zone = \"Asia/Riyadh\"\n",
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.coordinates(), Ok((21.4225, 39.8262)));
    assert_eq!(config.time_zone.as_deref(), Some("Asia/Riyadh"));
}

#[test]
fn test_broken_geo_toml_is_ignored() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "latitude = 3.139\nlongitude = 101.6869\n");
    fs::write(dir.path().join("geo.toml"), "latitude = [").unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.coordinates(), Ok((3.139, 101.6869)));
}

#[test]
fn test_default_config_content_parses() {
    let content = builder::default_config_content();
    let config: Config = toml::from_str(&content).unwrap();
    assert_eq!(config.method, Some(DEFAULT_METHOD));
    assert_eq!(config.time_format, Some(DEFAULT_TIME_FORMAT));
    // Coordinates ship commented out
    assert_eq!(config.latitude, None);
    assert!(content.contains("#latitude = 21.422500"));
}

#[test]
#[serial]
fn test_config_load_creates_default_then_fails_fast() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);

    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = Config::load();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    assert!(config_path.exists());
    let err = result.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MissingCoordinates)
    );
}
