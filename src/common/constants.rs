//! Defaults, validation limits, and timing constants shared across salatr.

use crate::output::OutputMode;
use crate::prayer::TimeFormat;
use crate::raw::{AsrFactor, CalculationMethod};

// # Files

pub const APP_DIR_NAME: &str = "salatr";
pub const CONFIG_FILE_NAME: &str = "salatr.toml";

// # Configuration defaults

pub const DEFAULT_METHOD: CalculationMethod = CalculationMethod::Isna;
pub const DEFAULT_ASR_FACTOR: AsrFactor = AsrFactor::Standard;
pub const DEFAULT_TIME_FORMAT: TimeFormat = TimeFormat::H24;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_DISPLAY_THRESHOLD: u32 = 10; // minutes
pub const DEFAULT_NOT_DISPLAYED: &[&str] = &["sunrise", "midnight"];
pub const DEFAULT_OUTPUT: OutputMode = OutputMode::Log;
pub const DEFAULT_HIJRI_ADJUSTMENT: i64 = 0; // days
pub const DEFAULT_SYNC_GRACE_SECONDS: u64 = 2;

// # Validation limits

pub const MAXIMUM_DISPLAY_THRESHOLD: u32 = 720; // 12 hours
pub const MINIMUM_HIJRI_ADJUSTMENT: i64 = -2;
pub const MAXIMUM_HIJRI_ADJUSTMENT: i64 = 2;
pub const MINIMUM_SYNC_GRACE_SECONDS: u64 = 1;
pub const MAXIMUM_SYNC_GRACE_SECONDS: u64 = 30;

// # Clock

/// A wall clock this far past the next prayer is treated as skew.
pub const SKEW_TOLERANCE_MINUTES: i64 = 1;

/// Advance/Reseed steps tried while catching up after a suspend before
/// falling back to a cold seed. One full cycle plus the day rollover.
pub const MAX_CATCH_UP_STEPS: usize = 8;

/// Wake this long after a minute boundary so the pulse lands inside the
/// new minute.
pub const PULSE_SLACK_MS: u64 = 50;

/// Polling interval for signals while a simulated sleep runs.
pub const SIMULATION_POLL_MS: u64 = 10;

/// Hour before which a raw Midnight belongs to the following civil day.
pub const MIDNIGHT_ROLLOVER_HOUR: u32 = 12;

// # Display

pub const PROGRESS_BAR_WIDTH: usize = 40;

// # Exit codes

pub const EXIT_FAILURE: i32 = 1;
