//! Remote-control daemon for a single trusted client.
//!
//! `pcctld` listens on a TCP port, accepts one client at a time and treats
//! every receive as a text command. Commands are trimmed, lower-cased, queued
//! and acknowledged with `Message received`; a separate dispatch loop drains
//! the queue and runs the host action bound to each name. The built-in
//! actions launch and terminate a configured program (`open_browser`,
//! `close_browser`), remembering its PID in memory and in a PID file.
//!
//! Two loggers run side by side. Operational telemetry goes through
//! `tracing` and is configured by [`pcctl_config::Config`]. The [`AuditLog`]
//! is the daemon's own record of what clients asked for and what happened,
//! with console and file sinks and an in-memory history that can be rendered
//! or dumped to disk.
//!
//! Shutdown is cooperative: a [`CancelToken`] fired by `SIGTERM`, `SIGINT`,
//! `SIGQUIT` or `SIGHUP` stops both loops at their next sleep boundary, after
//! which any program still running is killed.

pub mod audit;
mod bootstrap;
mod cancel;
pub mod commands;
mod health;
pub mod host;
pub mod pipeline;
mod process;
pub mod queue;
mod telemetry;
pub mod transport;

pub use audit::{AuditLog, AuditStats, DumpError, LogRecord};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, DaemonParts, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use cancel::CancelToken;
pub use commands::{ActionError, CommandAction, CommandRegistry, DispatchOutcome};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;
