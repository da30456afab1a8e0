//! FIFO hand-off between the ingestion and dispatch loops.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

const SESSION_END_COMMANDS: [&str; 2] = ["exit", "quit"];

/// A normalised command waiting for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingRequest(String);

impl PendingRequest {
    /// Trims and lower-cases raw client text.
    ///
    /// Returns `None` when nothing but whitespace remains.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        let normalised = raw.trim().to_lowercase();
        (!normalised.is_empty()).then_some(Self(normalised))
    }

    /// Normalised command text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the command ends the client session (`exit` or `quit`).
    #[must_use]
    pub fn is_session_end(&self) -> bool {
        SESSION_END_COMMANDS.contains(&self.0.as_str())
    }

    /// Consumes the request, returning its text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PendingRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Mutex-guarded queue of pending requests.
///
/// Push and pop each take the lock once, so a request is removed from the
/// queue before the caller acts on it.
#[derive(Debug, Default)]
pub struct RequestQueue {
    inner: Mutex<VecDeque<PendingRequest>>,
}

impl RequestQueue {
    /// Builds an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingRequest>> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Appends a request at the back.
    pub fn push(&self, request: PendingRequest) {
        self.lock().push_back(request);
    }

    /// Removes the oldest request, if any.
    #[must_use]
    pub fn pop(&self) -> Option<PendingRequest> {
        self.lock().pop_front()
    }

    /// Number of waiting requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no request is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
