//! Simulated-time setup for the `simulate` command.
//!
//! Installs a [`SimulatedTimeSource`] before the daemon starts, so every
//! timestamp and every minute pulse comes from the simulated clock. Start
//! and end are wall times in the configured prayer zone. With `--log` the
//! daemon's output goes to a file while the terminal shows a progress bar.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::common::constants::PROGRESS_BAR_WIDTH;
use crate::common::logger::{Log, LoggerGuard};
use crate::common::utils::ProgressBar;
use crate::config::Config;
use crate::time::source::{self, SimulatedTimeSource, TimeSource};

/// Resources that live as long as the simulation.
///
/// Dropping them before [`complete_simulation`](Self::complete_simulation)
/// reports the run as interrupted.
pub struct SimulationGuards {
    logger_guard: Option<LoggerGuard>,
    progress_handle: Option<thread::JoinHandle<()>>,
    progress_shutdown: Arc<AtomicBool>,
    log_to_file: bool,
    is_complete: bool,
}

impl SimulationGuards {
    /// Finish a run that reached its end time.
    pub fn complete_simulation(&mut self) {
        self.is_complete = true;
        self.stop_progress();

        if self.log_to_file {
            drop(self.logger_guard.take());
            println!("┣ Simulation complete");
            println!("╹");
        }
    }

    fn stop_progress(&mut self) {
        self.progress_shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.progress_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimulationGuards {
    fn drop(&mut self) {
        if self.is_complete {
            return;
        }
        self.stop_progress();
        if self.log_to_file {
            drop(self.logger_guard.take());
            println!("┣ Simulation interrupted");
            println!("╹");
        }
    }
}

/// Set up the simulated clock and, with `log_to_file`, the log file and the
/// progress bar. The caller runs the daemon while the guards are alive.
///
/// `multiplier` is simulated seconds per real second; 0.0 fast-forwards.
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
    log_to_file: bool,
) -> Result<SimulationGuards> {
    // A broken config is reported by the daemon itself; fall back to the
    // machine zone for parsing until then
    let prayer_tz = Config::load().ok().and_then(|c| c.time_zone().ok());

    let start = parse_wall_time(start_time, prayer_tz)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {e}"))?;
    let end = parse_wall_time(end_time, prayer_tz)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {e}"))?;
    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    let sim_source = Arc::new(SimulatedTimeSource::new(start, end, multiplier));
    let progress_shutdown = Arc::new(AtomicBool::new(false));
    let mut guards = SimulationGuards {
        logger_guard: None,
        progress_handle: None,
        progress_shutdown: progress_shutdown.clone(),
        log_to_file,
        is_complete: false,
    };

    if log_to_file {
        // Terminal header first, before timestamps switch to simulated time
        log_version!();
        log_block_start!("Simulation Mode");
        log_simulation_details(start_time, end_time, prayer_tz, multiplier, start, end);

        let log_filename = log_file_name();
        log_block_start!("Logging simulation output to: {}", log_filename);

        source::init_time_source(sim_source.clone());
        Log::set_display_timezone(prayer_tz);
        guards.logger_guard = Some(Log::start_file_logging(log_filename)?);
        guards.progress_handle = Some(spawn_progress_monitor(
            sim_source,
            start,
            end,
            multiplier,
            progress_shutdown,
        ));
    } else {
        source::init_time_source(sim_source);
        Log::set_display_timezone(prayer_tz);
    }

    // Into the log file too when --log is active
    log_version!();
    log_block_start!("Simulation Mode");
    log_simulation_details(start_time, end_time, prayer_tz, multiplier, start, end);
    log_indented!("Running simulation...");

    if debug_enabled {
        log_pipe!();
        log_debug!("Simulated time source initialized");
    }

    Ok(guards)
}

/// Name of the `--log` file for a simulation started now.
pub fn log_file_name() -> String {
    format!(
        "salatr-simulation-{}.log",
        Local::now().format("%Y%m%d-%H%M%S")
    )
}

/// "YYYY-MM-DD HH:MM:SS" in `tz`, or in the machine zone without one.
fn parse_wall_time(text: &str, tz: Option<Tz>) -> Result<DateTime<Local>, String> {
    match tz {
        Some(tz) => source::parse_datetime_in_tz(text, tz).map(|t| t.with_timezone(&Local)),
        None => {
            let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;
            Local
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| "Ambiguous or invalid local time".to_string())
        }
    }
}

/// Progress bar on the terminal, written directly to stdout so it stays
/// visible while the logger writes to the file.
fn spawn_progress_monitor(
    time_source: Arc<SimulatedTimeSource>,
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    multiplier: f64,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut progress_bar = ProgressBar::new(PROGRESS_BAR_WIDTH);
        let total_ms = end_time
            .signed_duration_since(start_time)
            .num_milliseconds()
            .max(1) as f64;
        let monitor_start = std::time::Instant::now();

        while !shutdown.load(Ordering::SeqCst) {
            let elapsed_ms = time_source
                .now()
                .signed_duration_since(start_time)
                .num_milliseconds() as f64;
            let progress = (elapsed_ms / total_ms).clamp(0.0, 1.0);

            let suffix = if multiplier == 0.0 {
                "fast-forward".to_string()
            } else if progress > 0.0 && progress < 1.0 {
                // Measured rate includes the daemon's own overhead
                let real_elapsed = monitor_start.elapsed().as_secs_f64();
                let remaining = (real_elapsed / progress - real_elapsed).max(0.0);
                format!("ETA: {remaining:.1}s")
            } else if progress >= 1.0 {
                "completing...".to_string()
            } else {
                format!("ETA: {:.1}s", total_ms / 1000.0 / multiplier)
            };
            progress_bar.update(progress as f32, Some(&suffix));

            if time_source.is_ended() {
                break;
            }
            thread::sleep(progress_bar.recommended_sleep().max(Duration::from_millis(10)));
        }
        progress_bar.finish();
    })
}

fn log_simulation_details(
    display_start: &str,
    display_end: &str,
    prayer_tz: Option<Tz>,
    multiplier: f64,
    start: DateTime<Local>,
    end: DateTime<Local>,
) {
    let duration = end.signed_duration_since(start);

    match prayer_tz {
        Some(tz) => log_decorated!("Simulating from {display_start} to {display_end} ({tz})"),
        None => log_decorated!("Simulating from {display_start} to {display_end}"),
    }
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );

    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        log_indented!(
            "Time acceleration: {}x (theoretical: ~{:.1} seconds)",
            multiplier,
            duration.num_milliseconds() as f64 / 1000.0 / multiplier
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_shape() {
        let name = log_file_name();
        assert!(name.starts_with("salatr-simulation-"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "salatr-simulation-20240401-204200.log".len());
    }

    #[test]
    fn test_wall_time_in_prayer_zone() {
        let parsed =
            parse_wall_time("2024-04-01 20:42:00", Some(chrono_tz::Asia::Kuala_Lumpur)).unwrap();
        assert_eq!(parsed.to_utc().to_rfc3339(), "2024-04-01T12:42:00+00:00");
    }

    #[test]
    fn test_wall_time_rejects_bad_format() {
        assert!(parse_wall_time("2024-04-01T20:42", None).is_err());
    }
}
