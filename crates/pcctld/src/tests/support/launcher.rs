//! Process launcher that records requests instead of touching the host.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use nix::errno::Errno;

use crate::host::{ProcessLauncher, StopSignal};

const FIRST_FAKE_PID: u32 = 40_000;

/// One call observed by [`RecordingLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherEvent {
    Spawned { program: String, pid: u32 },
    Signalled { pid: u32, signal: StopSignal },
}

/// Hands out increasing fake PIDs and records every signal.
#[derive(Debug)]
pub struct RecordingLauncher {
    next_pid: AtomicU32,
    fail_spawn: AtomicBool,
    events: Mutex<Vec<LauncherEvent>>,
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self {
            next_pid: AtomicU32::new(FIRST_FAKE_PID),
            fail_spawn: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingLauncher {
    /// Makes subsequent spawns fail with `NotFound`.
    pub fn fail_spawns(&self) {
        self.fail_spawn.store(true, Ordering::SeqCst);
    }

    /// Copy of the recorded calls.
    #[must_use]
    pub fn events(&self) -> Vec<LauncherEvent> {
        self.events.lock().expect("launcher mutex poisoned").clone()
    }

    /// PIDs handed out so far, in order.
    #[must_use]
    pub fn spawned(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LauncherEvent::Spawned { pid, .. } => Some(pid),
                LauncherEvent::Signalled { .. } => None,
            })
            .collect()
    }

    /// Signals delivered so far, in order.
    #[must_use]
    pub fn signals(&self) -> Vec<(u32, StopSignal)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LauncherEvent::Signalled { pid, signal } => Some((pid, signal)),
                LauncherEvent::Spawned { .. } => None,
            })
            .collect()
    }

    fn record(&self, event: LauncherEvent) {
        self.events
            .lock()
            .expect("launcher mutex poisoned")
            .push(event);
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn(&self, program: &str, _args: &[String]) -> io::Result<u32> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "program not found"));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.record(LauncherEvent::Spawned {
            program: program.to_owned(),
            pid,
        });
        Ok(pid)
    }

    fn signal(&self, pid: u32, signal: StopSignal) -> Result<(), Errno> {
        self.record(LauncherEvent::Signalled { pid, signal });
        Ok(())
    }
}
