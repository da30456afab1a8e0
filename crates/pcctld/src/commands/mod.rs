//! Name-to-action dispatch table.
//!
//! Bindings are registered while the daemon is being assembled and the
//! registry is then shared read-only with the dispatch loop. Names are exact
//! and case-sensitive; the endpoint lower-cases client text before it reaches
//! the registry.

mod errors;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::audit::AuditLog;

pub use errors::ActionError;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Command that launches the managed program.
pub const OPEN_BROWSER: &str = "open_browser";
/// Command that terminates the managed program.
pub const CLOSE_BROWSER: &str = "close_browser";

/// Zero-argument host action bound to a command name.
pub trait CommandAction: Send + Sync {
    /// Runs the action on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the action could not complete.
    fn run(&self) -> Result<(), ActionError>;
}

impl<F> CommandAction for F
where
    F: Fn() -> Result<(), ActionError> + Send + Sync,
{
    fn run(&self) -> Result<(), ActionError> {
        self()
    }
}

/// Result of a successful [`CommandRegistry::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A bound action ran to completion.
    Executed,
    /// No action is bound to the name; an ERROR record was written.
    Unhandled,
}

/// Registry of command bindings.
pub struct CommandRegistry {
    bindings: HashMap<String, Arc<dyn CommandAction>>,
    audit: Arc<AuditLog>,
}

impl CommandRegistry {
    /// Builds an empty registry reporting to `audit`.
    #[must_use]
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            bindings: HashMap::new(),
            audit,
        }
    }

    /// Binds `name` to `action`, returning the binding it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl CommandAction + 'static,
    ) -> Option<Arc<dyn CommandAction>> {
        self.register_shared(name, Arc::new(action))
    }

    /// Binds `name` to an already shared action.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        action: Arc<dyn CommandAction>,
    ) -> Option<Arc<dyn CommandAction>> {
        let name = name.into();
        debug!(target: DISPATCH_TARGET, command = %name, "registering command");
        self.bindings.insert(name, action)
    }

    /// Whether `name` has a binding.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Registered names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the registry has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Runs the action bound to `name`.
    ///
    /// An unknown name writes one ERROR record and runs nothing.
    ///
    /// # Errors
    ///
    /// Propagates the action's [`ActionError`] unchanged.
    pub fn dispatch(&self, name: &str) -> Result<DispatchOutcome, ActionError> {
        let Some(action) = self.bindings.get(name) else {
            self.audit
                .error(format_args!("No handler found for request: {name}"));
            return Ok(DispatchOutcome::Unhandled);
        };
        debug!(target: DISPATCH_TARGET, command = name, "running command");
        action.run()?;
        Ok(DispatchOutcome::Executed)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
