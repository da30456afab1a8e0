//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use pcctl_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the command endpoint is listening.
    fn endpoint_listening(&self, address: SocketAddr);

    /// Invoked when a client connects.
    fn peer_connected(&self, peer: SocketAddr);

    /// Invoked when the connected client is released.
    fn peer_released(&self, peer: SocketAddr);

    /// Invoked when a shutdown signal stops the loops.
    fn shutdown_requested(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn endpoint_listening(&self, address: SocketAddr) {
        (**self).endpoint_listening(address);
    }

    fn peer_connected(&self, peer: SocketAddr) {
        (**self).peer_connected(peer);
    }

    fn peer_released(&self, peer: SocketAddr) {
        (**self).peer_released(peer);
    }

    fn shutdown_requested(&self) {
        (**self).shutdown_requested();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen_host = %config.listen_host,
            listen_port = config.listen_port,
            audit_level = %config.audit_level(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn endpoint_listening(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "endpoint_listening",
            address = %address,
            "command endpoint ready"
        );
    }

    fn peer_connected(&self, peer: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_connected",
            peer = %peer,
            "client connected"
        );
    }

    fn peer_released(&self, peer: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_released",
            peer = %peer,
            "client released"
        );
    }

    fn shutdown_requested(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            "shutdown requested"
        );
    }
}
