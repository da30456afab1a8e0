//! Process-wide default audit log.
//!
//! Components receive an explicit `Arc<AuditLog>`; the default exists for code
//! that has no handle threaded through, such as the signal listener thread.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::AuditLog;

static DEFAULT_LOG: Lazy<RwLock<Arc<AuditLog>>> =
    Lazy::new(|| RwLock::new(Arc::new(AuditLog::default())));

/// Returns the current process-wide log, constructing it on first use.
#[must_use]
pub fn default_log() -> Arc<AuditLog> {
    let guard = DEFAULT_LOG
        .read()
        .unwrap_or_else(|poison| poison.into_inner());
    Arc::clone(&guard)
}

/// Replaces the process-wide log and returns the previous instance.
///
/// No history or sink configuration is carried over.
pub fn install_default(log: Arc<AuditLog>) -> Arc<AuditLog> {
    let mut guard = DEFAULT_LOG
        .write()
        .unwrap_or_else(|poison| poison.into_inner());
    std::mem::replace(&mut *guard, log)
}
