//! Structured logging system with visual formatting.
//!
//! Prayer snapshots, schedule rebuilds, and recovery notices all go through the
//! same box-drawing output so that a terminal running `salatr` reads as one
//! continuous log. Logging can be switched off at runtime, which the `times`
//! command and the test suites rely on.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

// Use an AtomicBool instead of thread_local for thread safety
static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Configured prayer timezone, shown next to machine time in simulation timestamps
static DISPLAY_TIMEZONE: OnceLock<Option<chrono_tz::Tz>> = OnceLock::new();

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Option<Sender<LogMessage>>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// To maintain a consistent and readable log output, adhere to the following conventions
/// when using the visual formatting macros:
///
/// - **`log_block_start!`**:
///   - **Purpose**: Always use this to initiate a new, distinct conceptual block of log information,
///     especially for major state changes or significant events (e.g., "Maghrib has begun",
///     "Loading configuration", "Schedule rebuilt").
///   - **Output**: Prepends an empty pipe `┃` for spacing from any previous log, then prints `┣ message`.
///   - **Usage**: Subsequent related messages within this conceptual block should typically use
///     `log_decorated!` or `log_indented!`.
///
/// - **`log_decorated!`**:
///   - **Purpose**: For logging messages that are part of an existing block started by `log_block_start!`,
///     or for simple, single-line status messages that don't warrant a full block but still fit the pipe structure.
///   - **Output**: Prints `┣ message`.
///   - **Context**: If this message is a continuation of a `log_block_start!`, it will appear visually connected.
///
/// - **`log_indented!`**:
///   - **Purpose**: For nested data or detailed sub-items that belong to a parent message
///     (often logged with `log_block_start!` or `log_decorated!`). Useful for listing configuration items,
///     multi-part details, etc.
///   - **Output**: Prints `┃   message` (pipe, three spaces, then message).
///
/// - **`log_pipe!`**:
///   - **Purpose**: Used explicitly to insert a single, empty, prefixed line (`┃`) for vertical spacing.
///   - **Usage**: Its primary use-case is to create visual separation to initiate a block *before* using
///     `log_warning!`, `log_error!`, `log_critical!`, `log_info!`, `log_debug!`, or logging
///     an `anyhow` error message.
///     Avoid using it if it might lead to double pipes or unnecessary empty lines before a `log_block_start!`
///     (which already provides top spacing) or `log_end!`. *Not for use at the end of a block.
///
/// - **`log_version!`**:
///   - **Purpose**: Prints the application startup header. Typically called once at the beginning.
///   - **Output**: `┏ salatr vX.Y.Z ━━╸`.
///
/// - **`log_end!`**:
///   - **Purpose**: Prints the final log termination marker. Called once at shutdown.
///   - **Output**: `╹`.
///
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**:
///   - **Purpose**: These are standard semantic logging macros. They use a `[LEVEL]` prefix
///     (e.g., `[INFO]`, `[WARNING]`, `[ERROR]`) and do not use the box-drawing characters.
///   - **Usage**: Use them for their semantic meaning when a message doesn't fit the structured
///     box-drawing style or when a specific log level prefix is more appropriate.
///     If they begin a new conceptual block of information that is *not* part of the primary
///     box-drawing flow, they ought to begin with a `log_pipe!`.
pub struct Log;

impl Log {
    /// Enable or disable logging temporarily.
    ///
    /// This is useful for quiet operation during automated processes
    /// or testing where log output would interfere with results.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Set the prayer timezone used for simulation timestamps.
    pub fn set_display_timezone(tz: Option<chrono_tz::Tz>) {
        let _ = DISPLAY_TIMEZONE.set(tz);
    }

    fn display_timezone() -> Option<chrono_tz::Tz> {
        DISPLAY_TIMEZONE.get().and_then(|tz| *tz)
    }

    /// Start file logging to the specified path.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        // Install the channel
        LOG_CHANNEL
            .set(Some(tx.clone()))
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        // Spawn logger thread
        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => {
                        file.write_all(text.as_bytes())?;
                    }
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    // # Helper Functions

    /// Timestamp prefix for simulation mode.
    ///
    /// Shows `[HH:MM:SSC] [HH:MM:SSL]` when the prayer timezone and the machine
    /// timezone disagree, `[HH:MM:SS]` otherwise, and nothing at all outside of
    /// simulation. Public for macro access.
    pub fn get_timestamp_prefix() -> String {
        // Check without initializing the time source
        if !(crate::time::source::is_initialized() && crate::time::source::is_simulated()) {
            return String::new();
        }

        let local_now = crate::time::source::now();
        let Some(prayer_tz) = Self::display_timezone() else {
            return format!("[{}] ", local_now.format("%H:%M:%S"));
        };

        let coord_str = local_now
            .with_timezone(&prayer_tz)
            .format("%H:%M:%S")
            .to_string();
        let local_str = local_now.format("%H:%M:%S").to_string();

        if coord_str != local_str {
            format!("[{coord_str}C] [{local_str}L] ")
        } else {
            format!("[{local_str}] ")
        }
    }
}

/// Guard for file logging that ensures clean shutdown.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        // LOG_CHANNEL stays set; OnceLock cannot be cleared and the process exits after simulation
    }
}

/// Line shape used by the logging macros.
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub enum Lead {
    /// `┣ message`
    Decorated,
    /// `┃   message`
    Indented,
    /// `┃` then `┣ message`
    Block,
    /// `┣[LEVEL] message` with an ANSI color code
    Level(&'static str, u8),
    /// `┃` then `┗[ERROR] message`
    Exit,
}

impl Lead {
    /// Render one message with the given timestamp prefix.
    pub fn render(self, prefix: &str, message: &str) -> String {
        match self {
            Lead::Decorated => format!("{prefix}┣ {message}\n"),
            Lead::Indented => format!("{prefix}┃   {message}\n"),
            Lead::Block => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            Lead::Level(label, color) => {
                format!("{prefix}┣[\x1b[{color}m{label}\x1b[0m] {message}\n")
            }
            Lead::Exit => format!("{prefix}┃\n{prefix}┗[\x1b[31mERROR\x1b[0m] {message}\n"),
        }
    }
}

// Strip ANSI color codes so log files stay plain text
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // Check if this is the start of an ANSI sequence
            if chars.peek() == Some(&'[') {
                chars.next(); // consume '['
                // Skip until we find 'm'
                for ch in chars.by_ref() {
                    if ch == 'm' {
                        break;
                    }
                }
            } else {
                result.push(ch);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// Route a rendered line to the --log file when active, stdout otherwise
pub fn write_output(text: &str) {
    if let Some(Some(tx)) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

#[doc(hidden)]
#[macro_export]
macro_rules! __log_emit {
    ($lead:expr, $fmt:literal $($arg:tt)*) => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = format!($fmt $($arg)*);
            $crate::common::logger::write_output(&$lead.render(&prefix, &message));
        }
    }};
    ($lead:expr, $expr:expr) => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = $expr.to_string();
            $crate::common::logger::write_output(&$lead.render(&prefix, &message));
        }
    }};
}

/// Log a message as part of the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_emit!($crate::common::logger::Lead::Decorated, $($arg)+) };
}

/// Log a nested detail line under the current block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_emit!($crate::common::logger::Lead::Indented, $($arg)+) };
}

/// Start a new block, with a spacer line above it.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => { $crate::__log_emit!($crate::common::logger::Lead::Block, $($arg)+) };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::__log_emit!($crate::common::logger::Lead::Level("WARNING", 33), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::__log_emit!($crate::common::logger::Lead::Level("ERROR", 31), $($arg)+)
    };
}

/// Log an error that ends the current flow (`┗[ERROR]`).
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => { $crate::__log_emit!($crate::common::logger::Lead::Exit, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::__log_emit!($crate::common::logger::Lead::Level("INFO", 32), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::__log_emit!($crate::common::logger::Lead::Level("DEBUG", 32), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => {
        $crate::__log_emit!($crate::common::logger::Lead::Level("CRITICAL", 31), $($arg)+)
    };
}

/// Empty `┃` spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::common::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Startup header.
#[macro_export]
macro_rules! log_version {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let version = env!("CARGO_PKG_VERSION");
            $crate::common::logger::write_output(&format!("{prefix}┏ salatr v{version} ━━╸\n"));
        }
    }};
}

/// Final `╹` marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::common::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        assert_eq!(
            strip_ansi_codes("┣[\x1b[33mWARNING\x1b[0m] stale"),
            "┣[WARNING] stale"
        );
        assert_eq!(strip_ansi_codes("plain"), "plain");
    }

    #[test]
    fn test_lead_render_shapes() {
        assert_eq!(Lead::Decorated.render("", "Isha"), "┣ Isha\n");
        assert_eq!(Lead::Indented.render("", "Fajr 05:39"), "┃   Fajr 05:39\n");
        assert_eq!(
            Lead::Block.render("[20:44:00] ", "Isha has begun"),
            "[20:44:00] ┃\n[20:44:00] ┣ Isha has begun\n"
        );
        assert_eq!(
            Lead::Level("INFO", 32).render("", "reload"),
            "┣[\x1b[32mINFO\x1b[0m] reload\n"
        );
    }
}
