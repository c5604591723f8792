//! Hot reload of the configuration files.
//!
//! Watches the directory holding `salatr.toml` (editors usually replace
//! files rather than write them in place) and the timetable, if one is
//! configured. Relevant changes become [`SignalMessage::Reload`] on the
//! main loop's channel.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use super::Config;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Editors write in several steps; one reload per burst.
const DEBOUNCE_MS: u64 = 500;

pub struct ConfigWatcher {
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
    watched_files: Vec<PathBuf>,
}

impl ConfigWatcher {
    pub fn new(signal_sender: Sender<SignalMessage>, debug_enabled: bool) -> Self {
        Self {
            signal_sender,
            debug_enabled,
            watched_files: Vec::new(),
        }
    }

    /// Watch `config_path`, the `geo.toml` beside it, and `schedule_file`.
    pub fn start(mut self, config_path: &Path, schedule_file: Option<&Path>) -> Result<()> {
        let Some(config_dir) = config_path.parent() else {
            return Ok(());
        };
        self.watched_files = vec![config_path.to_path_buf(), config_dir.join("geo.toml")];
        if let Some(schedule) = schedule_file {
            self.watched_files.push(schedule.to_path_buf());
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        let mut watched_dirs = HashSet::new();
        for file in &self.watched_files {
            if let Some(dir) = file.parent()
                && dir.is_dir()
                && watched_dirs.insert(dir.to_path_buf())
            {
                watcher
                    .watch(dir, RecursiveMode::NonRecursive)
                    .with_context(|| format!("Failed to watch directory: {}", private_path(dir)))?;
            }
        }

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching for configuration changes:");
            for dir in &watched_dirs {
                log_indented!("{}", private_path(dir));
            }
        }

        let signal_sender = self.signal_sender.clone();
        let debug_enabled = self.debug_enabled;
        let watched_files = self.watched_files.clone();

        thread::spawn(move || {
            // Dropping the watcher stops the events
            let _watcher = watcher;
            let mut last_reload: Option<Instant> = None;

            for event in rx {
                if !event.paths.iter().any(|p| affects(p, &watched_files)) {
                    continue;
                }
                if last_reload.is_some_and(|t| t.elapsed() < Duration::from_millis(DEBOUNCE_MS)) {
                    continue;
                }

                if debug_enabled {
                    log_pipe!();
                    log_info!("Configuration file change detected");
                }
                if signal_sender.send(SignalMessage::Reload).is_err() {
                    break;
                }
                last_reload = Some(Instant::now());
            }
        });

        Ok(())
    }
}

/// Exact match, or an editor's temporary sibling of a watched file
/// (`salatr.toml~`, `salatr.toml.swp`).
fn affects(event_path: &Path, watched_files: &[PathBuf]) -> bool {
    watched_files.iter().any(|watched| {
        if event_path == watched {
            return true;
        }
        event_path.parent() == watched.parent()
            && event_path
                .file_name()
                .and_then(|n| n.to_str())
                .zip(watched.file_name().and_then(|w| w.to_str()))
                .is_some_and(|(name, watched_name)| name.starts_with(watched_name))
    })
}

/// Start the watcher for the active configuration.
pub fn start_config_watcher(
    signal_sender: Sender<SignalMessage>,
    config: &Config,
    debug_enabled: bool,
) -> Result<()> {
    let config_path = Config::get_config_path()?;
    if !config_path.exists() {
        return Ok(());
    }
    ConfigWatcher::new(signal_sender, debug_enabled)
        .start(&config_path, config.schedule_file.as_deref())
}
