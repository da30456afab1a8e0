//! Loop bodies run on the pipeline threads.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::audit::AuditLog;
use crate::cancel::CancelToken;
use crate::health::HealthReporter;
use crate::transport::{CommandEndpoint, EndpointError};

use super::dispatcher::Dispatcher;
use super::{PIPELINE_TARGET, PipelineSettings};

/// Runs one loop iteration, turning errors and panics into audit records.
///
/// Returns `None` when the iteration failed and the loop should pause.
pub(super) fn run_iteration<T, E>(
    stage: &'static str,
    audit: &AuditLog,
    body: impl FnOnce() -> Result<T, E>,
) -> Option<T>
where
    E: fmt::Display,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(failure)) => {
            warn!(target: PIPELINE_TARGET, stage, error = %failure, "loop iteration failed");
            audit.error(format_args!("{stage} loop iteration failed: {failure}"));
            None
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(target: PIPELINE_TARGET, stage, panic = %message, "loop iteration panicked");
            audit.critical(format_args!("{stage} loop iteration panicked: {message}"));
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Start of the next iteration.
///
/// A successful iteration keeps a fixed cadence measured from its own start;
/// a failed one waits the full failure pause from now.
pub(super) fn next_start(
    started: Instant,
    interval: Duration,
    succeeded: bool,
    failure_pause: Duration,
) -> Instant {
    if succeeded {
        started + interval
    } else {
        Instant::now() + failure_pause
    }
}

/// Receives from the endpoint until cancelled, accepting a new peer whenever
/// none is connected.
///
/// An accept failure cancels the whole pipeline and is returned.
pub(super) fn run_ingestion(
    mut endpoint: CommandEndpoint,
    reporter: &Arc<dyn HealthReporter>,
    audit: &AuditLog,
    settings: PipelineSettings,
    cancel: &CancelToken,
) -> Result<(), EndpointError> {
    info!(target: PIPELINE_TARGET, stage = "ingestion", "loop started");
    while !cancel.is_cancelled() {
        if !endpoint.is_connected() {
            match endpoint.accept_connection(cancel) {
                Ok(Some(peer)) => reporter.peer_connected(peer),
                Ok(None) => break,
                Err(failure) => {
                    cancel.cancel();
                    return Err(failure);
                }
            }
        }
        let started = Instant::now();
        let peer = endpoint.peer_addr();
        let outcome = run_iteration("ingestion", audit, || {
            Ok::<_, Infallible>(endpoint.receive_once())
        });
        if let Some(outcome) = &outcome
            && outcome.released_peer()
            && let Some(peer) = peer
        {
            reporter.peer_released(peer);
        }
        cancel.sleep_until(next_start(
            started,
            settings.ingest_interval,
            outcome.is_some(),
            settings.failure_pause,
        ));
    }
    if let Some(peer) = endpoint.release_peer() {
        reporter.peer_released(peer);
    }
    info!(target: PIPELINE_TARGET, stage = "ingestion", "loop stopped");
    Ok(())
}

/// Runs dispatch cycles until cancelled.
pub(super) fn run_dispatch(
    dispatcher: &Dispatcher,
    audit: &AuditLog,
    settings: PipelineSettings,
    cancel: &CancelToken,
) {
    info!(target: PIPELINE_TARGET, stage = "dispatch", "loop started");
    while !cancel.is_cancelled() {
        let started = Instant::now();
        let succeeded = run_iteration("dispatch", audit, || dispatcher.cycle()).is_some();
        cancel.sleep_until(next_start(
            started,
            settings.dispatch_interval,
            succeeded,
            settings.failure_pause,
        ));
    }
    info!(target: PIPELINE_TARGET, stage = "dispatch", "loop stopped");
}
