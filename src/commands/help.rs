//! `salatr help [COMMAND]`: per-command help.

use anyhow::Result;

/// Show brief usage for a command (used for error messages)
pub fn show_command_usage(command: &str) {
    match command {
        "times" | "t" => log_block_start!("Usage: salatr times [DATE]"),
        "simulate" | "S" => log_block_start!(
            "Usage: salatr simulate <start> <end> [multiplier | --fast-forward] [--log]"
        ),
        "help" => log_block_start!("Usage: salatr help [COMMAND]"),
        _ => log_block_start!("Usage: salatr [OPTIONS] [COMMAND]"),
    }
}

/// Run the help command (dispatcher)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("times" | "t") => super::times::display_help(),
        Some("simulate" | "S") => super::simulate::display_help(),
        Some("help") => display_help_help(),
        Some(unknown) => {
            log_pipe!();
            log_warning!("Unknown command: {unknown}");
            display_general_help();
        }
    }
    Ok(())
}

fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("times, t [DATE]          Print the prayer schedule for a day");
    log_indented!("simulate, S <start> <end> Run with simulated time");
    log_indented!("help [COMMAND]           Show detailed help for a command");
    log_pipe!();
    log_info!("Use 'salatr help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'salatr --help' to see all options and general usage.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    show_command_usage("help");
    log_block_start!("Examples:");
    log_indented!("salatr help");
    log_indented!("salatr help times");
    log_indented!("salatr help simulate");
    log_end!();
}
