//! # salatr
//!
//! Prayer-time clock: builds each day's prayer schedule, tracks the current
//! and next prayer with a minute countdown, and keeps Hijri dates in step
//! with the Islamic day that starts at Maghrib.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`Salatr`] runs the display daemon
//! - **Core Logic**: `core` holds the [`PrayerClock`](core::clock::PrayerClock)
//!   state machine, the [`CountdownTicker`](core::ticker::CountdownTicker), and
//!   the main loop
//! - **Schedules**: `raw` computes or reads clock strings, `schedule` turns
//!   them into zoned instants, `hijri` labels them
//! - **Configuration**: `config` for TOML settings with hot reload
//! - **Output**: `output` renders snapshots to the terminal or as JSON
//! - **Infrastructure**: logging, signal handling, real and simulated time

// Logger macros must be declared first to be visible in every module
#[macro_use]
pub mod common;

pub mod args;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod hijri;
pub mod io;
pub mod output;
pub mod prayer;
pub mod raw;
pub mod schedule;
pub mod time;

mod salatr;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use salatr::Salatr;
