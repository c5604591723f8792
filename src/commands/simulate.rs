//! `salatr simulate`: the daemon against accelerated time.

use anyhow::Result;

use crate::salatr::Salatr;
use crate::time::{simulate, source};

/// Run the daemon from `start_time` to `end_time` of simulated time.
pub fn run_simulation(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
    log_to_file: bool,
) -> Result<()> {
    let mut guards = simulate::handle_simulate_command(
        start_time,
        end_time,
        multiplier,
        debug_enabled,
        log_to_file,
    )?;

    // Real instances keep their own watcher; a simulation reloads on SIGUSR2 only
    Salatr::new(debug_enabled)
        .without_headers()
        .without_watcher()
        .run()?;

    if source::simulation_ended() {
        guards.complete_simulation();
    }
    Ok(())
}

/// Shown by `salatr help simulate`.
pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Run with simulated time");
    log_block_start!("Usage: salatr simulate <start> <end> [multiplier | --fast-forward] [--log]");
    log_block_start!("Arguments:");
    log_indented!("start, end     Wall times as \"YYYY-MM-DD HH:MM:SS\" in the prayer zone");
    log_indented!("multiplier     Simulated seconds per real second (0.1 to 3600, default 3600)");
    log_indented!("--fast-forward Jump from one wake-up to the next without waiting");
    log_indented!("--log          Write the output to a file and show a progress bar");
    log_block_start!("Examples:");
    log_indented!("salatr simulate \"2024-04-01 19:00:00\" \"2024-04-02 06:00:00\" --fast-forward");
    log_indented!("salatr simulate \"2024-03-09 23:00:00\" \"2024-03-10 04:00:00\" 600 --log");
    log_end!();
}
