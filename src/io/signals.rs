//! Unix signal handling for the display daemon.
//!
//! A background thread turns process signals into [`SignalMessage`]s on the
//! main loop's channel. The config watcher sends on the same channel, so the
//! loop has a single place to wait.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;

/// Messages delivered to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    /// Reload the configuration (SIGUSR2 or a watched file changed).
    Reload,
    /// Stop the daemon (SIGINT, SIGTERM, SIGHUP).
    Shutdown,
}

/// Shared between the signal thread and the main loop.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives.
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Cloned into the config watcher.
    pub signal_sender: Sender<SignalMessage>,
}

impl SignalState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A state with no signal thread attached, for driving the loop from
    /// tests or one-shot commands.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_receiver,
            signal_sender,
        }
    }
}

/// Register the handlers and spawn the thread that forwards them.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::detached();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = state.running.clone();
    let sender = state.signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR2 => {
                    if sender.send(SignalMessage::Reload).is_err() {
                        break;
                    }
                    log_pipe!();
                    log_info!("Received configuration reload signal");
                }
                SIGHUP => {
                    // Terminal is gone, nowhere to log the goodbye
                    running.store(false, Ordering::SeqCst);
                    let _ = sender.send(SignalMessage::Shutdown);
                    break;
                }
                _ => {
                    log_pipe!();
                    match (sig, debug_enabled) {
                        (SIGINT, true) => {
                            log_info!("Received SIGINT (Ctrl+C), shutting down...")
                        }
                        (SIGINT, false) => log_info!("Received interrupt signal, shutting down..."),
                        _ => log_info!("Received termination request, shutting down..."),
                    }

                    running.store(false, Ordering::SeqCst);
                    if let Err(e) = sender.send(SignalMessage::Shutdown) {
                        log_warning!("Failed to send shutdown message: {e}");
                    }
                    break;
                }
            }
        }
    });

    Ok(state)
}

/// Apply a message to the loop's state. Returns `true` when the message asks
/// for a configuration reload.
pub fn handle_signal_message(message: SignalMessage, state: &SignalState) -> bool {
    match message {
        SignalMessage::Reload => true,
        SignalMessage::Shutdown => {
            state.running.store(false, Ordering::SeqCst);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_clears_running() {
        let state = SignalState::detached();
        assert!(state.is_running());
        assert!(!handle_signal_message(SignalMessage::Shutdown, &state));
        assert!(!state.is_running());
    }

    #[test]
    fn test_reload_requests_reload() {
        let state = SignalState::detached();
        assert!(handle_signal_message(SignalMessage::Reload, &state));
        assert!(state.is_running());
    }

    #[test]
    fn test_detached_channel_is_connected() {
        let state = SignalState::detached();
        state.signal_sender.send(SignalMessage::Reload).unwrap();
        assert_eq!(state.signal_receiver.try_recv(), Ok(SignalMessage::Reload));
    }
}
