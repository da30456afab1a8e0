//! Shutdown listener that only records its installation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cancel::CancelToken;
use crate::process::{ShutdownError, ShutdownSignal};

/// Leaves cancellation entirely to the test.
#[derive(Debug, Clone, Default)]
pub struct RecordingShutdown {
    installed: Arc<AtomicBool>,
}

impl RecordingShutdown {
    /// Whether the daemon installed the listener.
    #[must_use]
    pub fn installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl ShutdownSignal for RecordingShutdown {
    fn install(&self, _cancel: &CancelToken) -> Result<(), ShutdownError> {
        self.installed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
