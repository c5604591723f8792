//! Wall clock abstraction for real and simulated time.
//!
//! The prayer core never reads this module: every clock operation receives
//! `now` from its caller. Only the process driver (`core::Core`), the logger,
//! and the CLI commands ask the global source for the time, which lets the
//! `simulate` command replay a night of transitions in seconds.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Current wall time
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real system time.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated time source for replaying a time window.
///
/// Two modes are supported:
/// - Linear acceleration: simulated time flows at `multiplier` times real time
/// - Fast-forward (`multiplier == 0.0`): every sleep jumps instantly
pub struct SimulatedTimeSource {
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    multiplier: f64,
    /// Fast-forward mode position
    jumped_to: Mutex<Option<DateTime<Local>>>,
    /// Simulated time consumed by completed sleeps
    slept: Mutex<StdDuration>,
    /// Sleep currently in progress: (real start, simulated length)
    sleeping: Mutex<Option<(Instant, StdDuration)>>,
}

impl SimulatedTimeSource {
    /// Create a simulated source running from `start_time` to `end_time`.
    ///
    /// A `multiplier` of 0.0 selects fast-forward; negative values fall back
    /// to 3600x (one simulated hour per real second).
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, multiplier: f64) -> Self {
        let fast_forward = multiplier == 0.0;
        Self {
            start_time,
            end_time,
            multiplier: if fast_forward {
                0.0
            } else if multiplier < 0.0 {
                3600.0
            } else {
                multiplier
            },
            jumped_to: Mutex::new(fast_forward.then_some(start_time)),
            slept: Mutex::new(StdDuration::ZERO),
            sleeping: Mutex::new(None),
        }
    }

    fn is_fast_forward(&self) -> bool {
        self.multiplier == 0.0
    }

    fn current_time(&self) -> DateTime<Local> {
        if self.is_fast_forward() {
            let jumped = self.jumped_to.lock().map(|g| *g).unwrap_or(None);
            return jumped.unwrap_or(self.end_time);
        }

        let mut total = self.slept.lock().map(|g| *g).unwrap_or_default();
        if let Ok(guard) = self.sleeping.lock()
            && let Some((started, length)) = *guard
        {
            // Smooth progress through a long sleep
            let simulated = started.elapsed().mul_f64(self.multiplier);
            total += simulated.min(length);
        }

        let elapsed = ChronoDuration::from_std(total).unwrap_or(ChronoDuration::zero());
        (self.start_time + elapsed).min(self.end_time)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        self.current_time()
    }

    fn sleep(&self, duration: StdDuration) {
        if self.is_fast_forward() {
            if let Ok(mut guard) = self.jumped_to.lock()
                && let Some(current) = *guard
            {
                let step = ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::zero());
                *guard = Some((current + step).min(self.end_time));
            }
            // Let the log thread drain between jumps
            std::thread::sleep(StdDuration::from_millis(1));
            return;
        }

        let remaining = (self.end_time - self.current_time())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let length = duration.min(remaining);
        if length.is_zero() {
            return;
        }

        if let Ok(mut guard) = self.sleeping.lock() {
            *guard = Some((Instant::now(), length));
        }
        std::thread::sleep(length.div_f64(self.multiplier));
        if let Ok(mut guard) = self.sleeping.lock() {
            *guard = None;
        }
        if let Ok(mut slept) = self.slept.lock() {
            *slept += length;
        }
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

pub fn now() -> DateTime<Local> {
    source().now()
}

/// Current time expressed in the prayer timezone.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    now().with_timezone(&tz)
}

pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

pub fn is_simulated() -> bool {
    source().is_simulated()
}

/// Check if simulation has reached its end time (always false for real time)
pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse "YYYY-MM-DD HH:MM:SS" as a wall time in `tz`.
pub fn parse_datetime_in_tz(s: &str, tz: Tz) -> Result<DateTime<Tz>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;
    tz.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("Ambiguous or invalid time in timezone {tz}"))
}
