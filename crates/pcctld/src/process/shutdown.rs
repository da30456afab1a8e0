use std::io;
use std::thread;

use nix::sys::signal::Signal;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::audit;
use crate::cancel::CancelToken;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Arranges for `cancel` to fire when shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener cannot be installed.
    fn install(&self, cancel: &CancelToken) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener thread could not be started.
    #[error("failed to spawn signal listener: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener that cancels on `SIGTERM`, `SIGINT`, `SIGQUIT` or `SIGHUP`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self, cancel: &CancelToken) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let cancel = cancel.clone();
        thread::Builder::new()
            .name("pcctld-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    record_shutdown_signal(signal);
                    cancel.cancel();
                }
            })
            .map_err(|source| ShutdownError::Spawn { source })?;
        Ok(())
    }
}

/// Notes the signal in telemetry and in the process-wide audit log, which is
/// the only log reachable from the listener thread.
fn record_shutdown_signal(signal: i32) {
    let name = Signal::try_from(signal).map_or("unknown signal", Signal::as_str);
    info!(target: PROCESS_TARGET, signal, name, "shutdown signal received");
    audit::default_log().info(format_args!("Received {name}, shutting down"));
}
