//! One dispatch cycle: dequeue a request and run its action.

use std::sync::Arc;

use tracing::debug;

use crate::audit::AuditLog;
use crate::commands::{ActionError, CommandRegistry, DISPATCH_TARGET, DispatchOutcome};
use crate::queue::{PendingRequest, RequestQueue};

/// What a [`Dispatcher::cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The queue was empty.
    Idle,
    /// An `exit` or `quit` command was consumed; the endpoint already closed
    /// the session.
    SessionEnded(PendingRequest),
    /// The request was looked up in the registry.
    Dispatched {
        request: PendingRequest,
        outcome: DispatchOutcome,
    },
}

/// Consumer side of the request queue.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    queue: Arc<RequestQueue>,
    registry: Arc<CommandRegistry>,
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    /// Builds a dispatcher draining `queue` into `registry`.
    #[must_use]
    pub fn new(
        queue: Arc<RequestQueue>,
        registry: Arc<CommandRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            queue,
            registry,
            audit,
        }
    }

    /// Dequeues at most one request and dispatches it.
    ///
    /// The request leaves the queue before its action runs, so a failing
    /// action is never retried.
    ///
    /// # Errors
    ///
    /// Propagates the action's [`ActionError`].
    pub fn cycle(&self) -> Result<CycleOutcome, ActionError> {
        let Some(request) = self.queue.pop() else {
            return Ok(CycleOutcome::Idle);
        };
        if request.is_session_end() {
            self.audit
                .debug(format_args!("Session command '{request}' closed the connection"));
            return Ok(CycleOutcome::SessionEnded(request));
        }
        debug!(target: DISPATCH_TARGET, command = %request, "dispatching request");
        let outcome = self.registry.dispatch(request.as_str())?;
        Ok(CycleOutcome::Dispatched { request, outcome })
    }
}
