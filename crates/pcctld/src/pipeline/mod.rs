//! The two long-lived loops connecting the endpoint to the registry.
//!
//! Ingestion receives from the connected peer at a fixed cadence and feeds the
//! request queue. Dispatch drains one request per cycle at its own cadence and
//! starts only after a fixed delay. Both loops observe a shared
//! [`CancelToken`] at their sleep boundaries, and a failed or panicking
//! iteration is logged and followed by a pause instead of ending the loop.

mod dispatcher;
mod worker;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use pcctl_config::Config;

use crate::audit::AuditLog;
use crate::cancel::CancelToken;
use crate::health::HealthReporter;
use crate::transport::{CommandEndpoint, EndpointError};

pub use dispatcher::{CycleOutcome, Dispatcher};

pub(crate) const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

const INGEST_THREAD: &str = "pcctld-ingest";
const DISPATCH_THREAD: &str = "pcctld-dispatch";

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Period of one ingestion iteration.
    pub ingest_interval: Duration,
    /// Period of one dispatch cycle.
    pub dispatch_interval: Duration,
    /// Delay between starting ingestion and starting dispatch.
    pub startup_delay: Duration,
    /// Pause after an iteration that failed or panicked.
    pub failure_pause: Duration,
}

impl PipelineSettings {
    /// Reads the loop timing from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ingest_interval: config.ingest_interval(),
            dispatch_interval: config.dispatch_interval(),
            startup_delay: config.startup_delay(),
            failure_pause: config.failure_pause(),
        }
    }
}

/// Errors surfaced by the pipeline threads.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A loop thread could not be started.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Name of the thread.
        thread: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The ingestion loop could not accept a new peer.
    #[error("ingestion stopped: {0}")]
    Ingestion(#[from] EndpointError),
    /// A loop thread panicked outside the per-iteration guard.
    #[error("{thread} thread panicked")]
    ThreadPanic {
        /// Name of the thread.
        thread: &'static str,
    },
}

/// Everything the loops need, handed over when they start.
pub struct Pipeline {
    /// Endpoint owned by the ingestion loop.
    pub endpoint: CommandEndpoint,
    /// Consumer run by the dispatch loop.
    pub dispatcher: Dispatcher,
    /// Observer notified when peers come and go.
    pub reporter: Arc<dyn HealthReporter>,
    /// Log receiving iteration failures.
    pub audit: Arc<AuditLog>,
    /// Loop timing.
    pub settings: PipelineSettings,
}

impl Pipeline {
    /// Starts ingestion, waits the startup delay, then starts dispatch.
    ///
    /// Dispatch is not started when `cancel` fires during the delay.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Spawn`] when a thread cannot be created; any
    /// thread already running is cancelled.
    pub fn start(self, cancel: &CancelToken) -> Result<PipelineHandle, PipelineError> {
        let Self {
            endpoint,
            dispatcher,
            reporter,
            audit,
            settings,
        } = self;

        let mut handle = PipelineHandle {
            cancel: cancel.clone(),
            ingest: None,
            dispatch: None,
        };

        let ingest_audit = Arc::clone(&audit);
        let ingest_cancel = cancel.clone();
        let ingest = thread::Builder::new()
            .name(INGEST_THREAD.to_owned())
            .spawn(move || {
                worker::run_ingestion(endpoint, &reporter, &ingest_audit, settings, &ingest_cancel)
            })
            .map_err(|source| PipelineError::Spawn {
                thread: INGEST_THREAD,
                source,
            })?;
        handle.ingest = Some(ingest);

        if !cancel.sleep(settings.startup_delay) {
            return Ok(handle);
        }

        let dispatch_cancel = cancel.clone();
        let dispatch = thread::Builder::new()
            .name(DISPATCH_THREAD.to_owned())
            .spawn(move || worker::run_dispatch(&dispatcher, &audit, settings, &dispatch_cancel))
            .map_err(|source| PipelineError::Spawn {
                thread: DISPATCH_THREAD,
                source,
            })?;
        handle.dispatch = Some(dispatch);
        info!(target: PIPELINE_TARGET, "pipeline running");
        Ok(handle)
    }
}

/// Handle to the running loops. Dropping it cancels them.
pub struct PipelineHandle {
    cancel: CancelToken,
    ingest: Option<JoinHandle<Result<(), EndpointError>>>,
    dispatch: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Waits for both loops to finish.
    ///
    /// # Errors
    ///
    /// Returns the ingestion loop's fatal error, or
    /// [`PipelineError::ThreadPanic`] when a thread panicked outside an
    /// iteration.
    pub fn join(mut self) -> Result<(), PipelineError> {
        let ingest = match self.ingest.take().map(JoinHandle::join) {
            None | Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(failure))) => Err(PipelineError::Ingestion(failure)),
            Some(Err(_)) => Err(PipelineError::ThreadPanic {
                thread: INGEST_THREAD,
            }),
        };
        let dispatch = match self.dispatch.take().map(JoinHandle::join) {
            None | Some(Ok(())) => Ok(()),
            Some(Err(_)) => Err(PipelineError::ThreadPanic {
                thread: DISPATCH_THREAD,
            }),
        };
        ingest.and(dispatch)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
