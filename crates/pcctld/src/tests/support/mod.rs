//! Test doubles and helpers shared by the unit and behaviour suites.

mod buffer;
mod config_loader;
mod launcher;
mod reporter;
mod shutdown;

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub use buffer::SharedBuffer;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use launcher::{LauncherEvent, RecordingLauncher};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::RecordingShutdown;

/// Serialises tests that swap the process-wide default audit log.
pub static DEFAULT_AUDIT_GUARD: Mutex<()> = Mutex::new(());

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or [`WAIT_TIMEOUT`] elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    condition()
}
