//! Lifecycle of the display daemon.
//!
//! Loads the configuration, installs signal handling and the config watcher,
//! then hands over to [`Core`]. The builder covers the two ways the daemon
//! starts:
//! - Normal startup: `Salatr::new(debug_enabled).run()`
//! - Simulation: `Salatr::new(debug_enabled).without_headers().run()`

use anyhow::Result;

use crate::{
    common::{constants::EXIT_FAILURE, logger::Log},
    config::{self, Config},
    error::ConfigError,
    core::{Core, CoreParams},
    io::signals::setup_signal_handler,
};

/// Builder for running the daemon.
///
/// ```no_run
/// use salatr::Salatr;
///
/// # fn main() -> anyhow::Result<()> {
/// Salatr::new(false).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Salatr {
    debug_enabled: bool,
    show_headers: bool,
    watch_config: bool,
}

impl Salatr {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            show_headers: true,
            watch_config: true,
        }
    }

    /// Skip the version header (the caller already printed one).
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Do not hot-reload on file changes. SIGUSR2 still reloads.
    pub fn without_watcher(mut self) -> Self {
        self.watch_config = false;
        self
    }

    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
        }

        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_pipe!();
                log_critical!("{e:#}");
                if let Some(hint) = config_failure_hint(&e) {
                    log_indented!("{hint}");
                }
                log_error_exit!("Configuration failed");
                std::process::exit(EXIT_FAILURE);
            }
        };
        if let Ok(tz) = config.time_zone() {
            Log::set_display_timezone(Some(tz));
        }

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        if self.watch_config
            && let Err(e) = config::start_config_watcher(
                signal_state.signal_sender.clone(),
                &config,
                self.debug_enabled,
            )
            && self.debug_enabled
        {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Hot config reload disabled, use SIGUSR2 for manual reload");
        }

        config.log_config();

        let core = Core::new(CoreParams {
            config,
            signal_state,
            debug_enabled: self.debug_enabled,
        })?;

        core.execute()
    }
}

/// What the operator has to change for a configuration error to go away.
fn config_failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    let config_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ConfigError>())?;
    Some(match config_error {
        ConfigError::MissingCoordinates => {
            "Set latitude and longitude in salatr.toml or in geo.toml beside it"
        }
        ConfigError::UnknownTimeZone(_) => {
            "Set time_zone to an IANA name such as \"Asia/Kuala_Lumpur\""
        }
        ConfigError::ScheduleFileMissing(_) => {
            "Fix schedule_file or remove it to compute times from the coordinates"
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_hint_found_through_context() {
        let err = Err::<(), _>(ConfigError::MissingCoordinates)
            .context("Failed to load configuration from ~/.config/salatr/salatr.toml")
            .unwrap_err();
        assert_eq!(
            config_failure_hint(&err),
            Some("Set latitude and longitude in salatr.toml or in geo.toml beside it")
        );

        let err = anyhow::Error::from(ConfigError::ScheduleFileMissing(PathBuf::from("x.json")));
        assert!(config_failure_hint(&err).is_some_and(|h| h.contains("schedule_file")));
    }

    #[test]
    fn test_no_hint_for_range_errors() {
        let err = anyhow::Error::from(ConfigError::InvalidLatitude(91.0));
        assert_eq!(config_failure_hint(&err), None);
        assert_eq!(config_failure_hint(&anyhow::anyhow!("disk full")), None);
    }
}
