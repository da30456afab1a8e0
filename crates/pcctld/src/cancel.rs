//! Cooperative cancellation shared by the daemon's loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Clonable cancellation flag observed at sleep boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Builds a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Blocks until cancellation is requested.
    pub fn wait(&self) {
        while !self.is_cancelled() {
            thread::sleep(SLEEP_SLICE);
        }
    }

    /// Sleeps for `duration` in short slices.
    ///
    /// Returns `false` as soon as cancellation is observed, `true` when the
    /// full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.sleep_until(Instant::now() + duration)
    }

    /// Sleeps until `deadline` in short slices; see [`CancelToken::sleep`].
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
