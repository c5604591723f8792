//! Process driver for the prayer clock.
//!
//! `Core` owns the [`CountdownTicker`], the output sink and the signal
//! channel. It sleeps until the next minute boundary (or the pending
//! post-zero lookup, whichever comes first), then feeds the ticker a pulse
//! carrying the wall clock's minute of hour. Signals and config changes
//! interrupt the sleep through `recv_timeout`.

pub mod clock;
pub mod ticker;

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::{
    common::{constants::*, logger::Log, utils::private_path},
    config::{self, Config},
    core::{
        clock::{PrayerClock, Resync, Snapshot},
        ticker::{CountdownTicker, TickReport},
    },
    io::signals::{SignalMessage, SignalState, handle_signal_message},
    output::{JsonSink, LogSink, OutputMode, SnapshotSink},
    schedule::DayScheduleBuilder,
    time::source,
};

/// Parameters for creating a Core instance.
pub(crate) struct CoreParams {
    pub config: Config,
    pub signal_state: SignalState,
    pub debug_enabled: bool,
}

pub(crate) struct Core {
    config: Config,
    signal_state: SignalState,
    debug_enabled: bool,
    ticker: CountdownTicker,
    sink: Box<dyn SnapshotSink>,
}

impl Core {
    /// Build today's schedule and seed the clock. Fails when the first
    /// schedule cannot be built: there is no previous one to fall back on.
    pub fn new(params: CoreParams) -> Result<Self> {
        let ticker = build_ticker(&params.config)?;
        let sink = install_sink(&params.config, params.debug_enabled);
        Ok(Self {
            config: params.config,
            signal_state: params.signal_state,
            debug_enabled: params.debug_enabled,
            ticker,
            sink,
        })
    }

    pub fn execute(mut self) -> Result<()> {
        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", private_path(&custom_dir));
        }
        log_block_start!(
            "Prayer times from the {} provider",
            self.ticker.clock().builder().provider_name()
        );

        let snapshot = self.ticker.initial_snapshot();
        self.publish(&snapshot);

        self.main_loop()?;

        log_block_start!("Shutting down salatr...");
        log_end!();
        Ok(())
    }

    fn time_zone(&self) -> Tz {
        self.ticker.clock().time_zone()
    }

    fn main_loop(&mut self) -> Result<()> {
        let mut last_minute = minute_key(&source::now_in(self.time_zone()));

        while self.signal_state.is_running() && !source::simulation_ended() {
            let now = source::now_in(self.time_zone());
            let sleep_for = sleep_duration(&now, self.ticker.next_deadline());

            match self.wait(sleep_for) {
                Ok(message) => {
                    if handle_signal_message(message, &self.signal_state) {
                        self.handle_config_reload();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = source::now_in(self.time_zone());
                    let minute = minute_key(&now);
                    let report = if minute != last_minute {
                        last_minute = minute;
                        self.ticker.on_external_tick(Some(now.minute()), now)
                    } else {
                        self.ticker.poll(now)
                    };
                    self.handle_report(report);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if self.signal_state.is_running() {
                        log_pipe!();
                        log_error!("Signal channel disconnected unexpectedly");
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Block until `duration` has passed or a message arrives.
    ///
    /// Simulated sleeps run on their own thread so signals still get through
    /// while the time source scales the wait.
    fn wait(&self, duration: Duration) -> Result<SignalMessage, RecvTimeoutError> {
        if !source::is_simulated() {
            return self.signal_state.signal_receiver.recv_timeout(duration);
        }

        let sleep_handle = std::thread::spawn(move || source::sleep(duration));
        loop {
            match self
                .signal_state
                .signal_receiver
                .recv_timeout(Duration::from_millis(SIMULATION_POLL_MS))
            {
                Ok(message) => break Ok(message),
                Err(RecvTimeoutError::Timeout) => {
                    if sleep_handle.is_finished() {
                        break Err(RecvTimeoutError::Timeout);
                    }
                }
                Err(e) => break Err(e),
            }
        }
    }

    fn handle_report(&mut self, report: TickReport) {
        for err in &report.errors {
            log_pipe!();
            log_warning!("{err}");
        }

        if self.debug_enabled {
            if report.refreshed {
                log_debug!(
                    "Schedule rebuilt for {}",
                    self.ticker.clock().schedule().date()
                );
            }
            if let Some(Resync::Corrected { from, to }) = report.resync {
                log_debug!("Countdown corrected from {from} to {to} minute(s)");
            }
        }

        if let Some(snapshot) = report.snapshot {
            self.publish(&snapshot);
        }
    }

    fn publish(&mut self, snapshot: &Snapshot) {
        if let Err(e) = self.sink.publish(snapshot) {
            log_pipe!();
            log_error!("Failed to publish prayer state: {e:#}");
        }
    }

    /// Reload the configuration and rebuild the clock from it. Any failure
    /// keeps the running configuration and clock.
    ///
    /// Runs even when the file content is unchanged, since the reload may
    /// come from an edited timetable.
    fn handle_config_reload(&mut self) {
        let new_config = match config::load() {
            Ok(config) => config,
            Err(e) => {
                log_pipe!();
                log_error!("Configuration reload failed: {e:#}");
                log_indented!("Keeping the running configuration");
                return;
            }
        };
        if self.debug_enabled && new_config == self.config {
            log_pipe!();
            log_debug!("Settings unchanged, rebuilding the schedule anyway");
        }

        match build_ticker(&new_config) {
            Ok(mut ticker) => {
                self.sink = install_sink(&new_config, self.debug_enabled);
                log_block_start!("Configuration reloaded");
                if self.debug_enabled {
                    new_config.log_config();
                }
                self.config = new_config;

                let snapshot = ticker.initial_snapshot();
                self.ticker = ticker;
                self.publish(&snapshot);
            }
            Err(e) => {
                log_pipe!();
                log_error!("Cannot build a schedule from the new configuration: {e:#}");
                log_indented!("Keeping the running configuration");
            }
        }
    }
}

/// Builder, seeded clock and ticker for `config`.
pub(crate) fn build_ticker(config: &Config) -> Result<CountdownTicker> {
    let builder = DayScheduleBuilder::from_config(config)?;
    if let Some(warning) = builder.hijri().locale_warning() {
        log_pipe!();
        log_warning!("{warning}");
    }

    let now = source::now_in(builder.time_zone());
    let clock = PrayerClock::start(builder, now)
        .with_context(|| format!("Failed to build the prayer schedule for {}", now.date_naive()))?;
    Ok(CountdownTicker::new(clock, config.sync_grace()))
}

/// Sink for the configured output mode.
///
/// JSON output owns stdout, so the terminal logger is switched off unless
/// `--debug` asked for it.
pub(crate) fn install_sink(config: &Config, debug_enabled: bool) -> Box<dyn SnapshotSink> {
    match config.output() {
        OutputMode::Log => {
            Log::set_enabled(true);
            Box::new(LogSink::new(
                config.hidden_prayers(),
                config.display_threshold(),
            ))
        }
        OutputMode::Json => {
            Log::set_enabled(debug_enabled);
            Box::new(JsonSink::new(std::io::stdout()))
        }
    }
}

/// Minutes since the epoch; changes exactly at minute boundaries.
fn minute_key(now: &DateTime<Tz>) -> i64 {
    now.timestamp().div_euclid(60)
}

/// Time until just past the next minute boundary, or until `deadline` when
/// that comes first.
pub fn sleep_duration(now: &DateTime<Tz>, deadline: Option<DateTime<Tz>>) -> Duration {
    let into_minute_ms = i64::from(now.second()) * 1000 + i64::from(now.nanosecond() / 1_000_000);
    let to_boundary_ms = (60_000 - into_minute_ms.min(59_999)) as u64 + PULSE_SLACK_MS;
    let mut sleep_for = Duration::from_millis(to_boundary_ms);

    if let Some(deadline) = deadline {
        let to_deadline = (deadline - *now).to_std().unwrap_or(Duration::ZERO);
        sleep_for = sleep_for.min(to_deadline);
    }
    sleep_for
}
