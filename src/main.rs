//! Binary entry point: parse the arguments and dispatch.
//!
//! Everything else lives in the library so the integration tests can reach
//! it; see `lib.rs` for the module layout.

use anyhow::Result;

use salatr::Salatr;
use salatr::args::{self, CliAction, ParsedArgs};
use salatr::commands;
use salatr::common::constants::EXIT_FAILURE;
use salatr::config;
use salatr::{log_end, log_error_exit};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::HelpCommand { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            Salatr::new(debug_enabled).run()
        }
        CliAction::TimesCommand {
            debug_enabled,
            date,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            if let Err(e) = commands::times::handle_times_command(date.as_deref(), debug_enabled) {
                log_error_exit!("{e:#}");
                log_end!();
                std::process::exit(EXIT_FAILURE);
            }
            Ok(())
        }
        CliAction::Simulate {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            log_to_file,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::simulate::run_simulation(
                &start_time,
                &end_time,
                multiplier,
                debug_enabled,
                log_to_file,
            )
        }
    }
}
