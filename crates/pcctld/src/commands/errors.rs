//! Failures raised by command actions.

use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::host::PidFileError;

/// Error returned by a [`CommandAction`](super::CommandAction).
///
/// The registry propagates these unchanged; the dispatch loop records them.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The managed program could not be started.
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        /// Program that was being launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Delivering a signal to the managed program failed.
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        /// Target process identifier.
        pid: u32,
        /// Error reported by `kill(2)`.
        #[source]
        source: Errno,
    },

    /// The process identifier could not be persisted or read back.
    #[error(transparent)]
    PidFile(#[from] PidFileError),

    /// Free-form failure reported by a custom action.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl ActionError {
    /// Builds a free-form failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
