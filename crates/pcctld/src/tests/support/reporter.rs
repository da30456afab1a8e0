//! Test double for [`HealthReporter`] that records structured events.

use std::net::SocketAddr;
use std::sync::Mutex;

use pcctl_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    EndpointListening(SocketAddr),
    PeerConnected(SocketAddr),
    PeerReleased(SocketAddr),
    ShutdownRequested,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported by the first `endpoint_listening` event.
    #[must_use]
    pub fn listening_address(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::EndpointListening(address) => Some(address),
            _ => None,
        })
    }

    /// Number of recorded events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&HealthEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn endpoint_listening(&self, address: SocketAddr) {
        self.record(HealthEvent::EndpointListening(address));
    }

    fn peer_connected(&self, peer: SocketAddr) {
        self.record(HealthEvent::PeerConnected(peer));
    }

    fn peer_released(&self, peer: SocketAddr) {
        self.record(HealthEvent::PeerReleased(peer));
    }

    fn shutdown_requested(&self) {
        self.record(HealthEvent::ShutdownRequested);
    }
}
