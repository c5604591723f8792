//! Command-line argument parsing.
//!
//! Turns the raw argument list into a [`CliAction`] for `main.rs` to
//! dispatch. Flags may appear anywhere; the first bare word picks the
//! command. Unknown flags and commands fall back to the help screen.

/// Default simulation speed: one simulated hour per real second.
pub const DEFAULT_SIMULATION_MULTIPLIER: f64 = 3600.0;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the display daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Print one day's schedule and exit
    TimesCommand {
        debug_enabled: bool,
        date: Option<String>,
        config_dir: Option<String>,
    },
    /// Run the daemon against simulated time
    Simulate {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        /// Simulated seconds per real second; 0.0 selects fast-forward
        multiplier: f64,
        log_to_file: bool,
        config_dir: Option<String>,
    },
    /// Detailed help for one command, or the command list
    HelpCommand { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse `args` (program name first, as from `std::env::args()`).
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut fast_forward = false;
        let mut log_to_file = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut words: Vec<String> = Vec::new();

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = args_vec[i].as_str();
            match arg_str {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--config" | "-c" => match args_vec.get(i + 1) {
                    Some(dir) => {
                        config_dir = Some(dir.clone());
                        i += 1;
                    }
                    None => {
                        log_warning!("Missing directory for --config");
                        unknown_arg_found = true;
                    }
                },
                "--fast-forward" => fast_forward = true,
                "--log" => log_to_file = true,
                _ => {
                    // Negative numbers are words, not options
                    if arg_str.starts_with('-') && arg_str.parse::<f64>().is_err() {
                        log_warning!("Unknown option: {arg_str}");
                        unknown_arg_found = true;
                    } else {
                        words.push(arg_str.to_string());
                    }
                }
            }
            i += 1;
        }

        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }
        if unknown_arg_found {
            return ParsedArgs {
                action: CliAction::ShowHelpDueToError,
            };
        }

        let simulate_only = |action: CliAction| {
            if fast_forward || log_to_file {
                log_warning!("--fast-forward and --log only apply to the simulate command");
                CliAction::ShowHelpDueToError
            } else {
                action
            }
        };

        let action = match words.first().map(String::as_str) {
            None => simulate_only(CliAction::Run {
                debug_enabled,
                config_dir,
            }),
            Some("times" | "t") => {
                if words.len() > 2 {
                    log_warning!("times takes at most one date");
                    CliAction::ShowHelpDueToError
                } else {
                    simulate_only(CliAction::TimesCommand {
                        debug_enabled,
                        date: words.get(1).cloned(),
                        config_dir,
                    })
                }
            }
            Some("help") => simulate_only(CliAction::HelpCommand {
                command: words.get(1).cloned(),
            }),
            Some("simulate" | "S") => {
                match parse_simulate(&words[1..], fast_forward) {
                    Ok((start_time, end_time, multiplier)) => CliAction::Simulate {
                        debug_enabled,
                        start_time,
                        end_time,
                        multiplier,
                        log_to_file,
                        config_dir,
                    },
                    Err(message) => {
                        log_warning!("{message}");
                        CliAction::ShowHelpDueToError
                    }
                }
            }
            Some(unknown) => {
                log_warning!("Unknown command: {unknown}");
                CliAction::ShowHelpDueToError
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// `<start> <end> [multiplier]`, with `--fast-forward` in place of the
/// multiplier.
fn parse_simulate(words: &[String], fast_forward: bool) -> Result<(String, String, f64), String> {
    let usage = "Usage: simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier | --fast-forward] [--log]";

    // Format only; the zone-aware parse happens in the simulate command
    let looks_like_datetime = |s: &str| {
        s.len() == 19
            && s.chars().nth(4) == Some('-')
            && s.chars().nth(7) == Some('-')
            && s.chars().nth(10) == Some(' ')
            && s.chars().nth(13) == Some(':')
            && s.chars().nth(16) == Some(':')
    };

    let (start, end, rest) = match words {
        [start, end, rest @ ..] => (start, end, rest),
        _ => return Err(format!("Missing start or end time. {usage}")),
    };
    if !looks_like_datetime(start) {
        return Err(format!(
            "Invalid start time format: '{start}'. Use YYYY-MM-DD HH:MM:SS"
        ));
    }
    if !looks_like_datetime(end) {
        return Err(format!(
            "Invalid end time format: '{end}'. Use YYYY-MM-DD HH:MM:SS"
        ));
    }

    let multiplier = match (rest, fast_forward) {
        ([], true) => 0.0,
        ([], false) => DEFAULT_SIMULATION_MULTIPLIER,
        ([_], true) => return Err("Use either a multiplier or --fast-forward, not both".into()),
        ([value], false) => match value.parse::<f64>() {
            Ok(mult) if (0.1..=3600.0).contains(&mult) => mult,
            _ => {
                return Err(format!(
                    "Invalid multiplier: {value}. Must be between 0.1 and 3600."
                ));
            }
        },
        _ => return Err(format!("Too many arguments. {usage}")),
    };

    Ok((start.clone(), end.clone(), multiplier))
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("salatr [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("times, t [DATE]        Print the prayer schedule for a day");
    log_indented!("simulate, S <start> <end> [multiplier | --fast-forward] [--log]");
    log_indented!("                       Run with simulated time");
    log_indented!("help [COMMAND]         Show detailed help for a command");
    log_end!();
}
