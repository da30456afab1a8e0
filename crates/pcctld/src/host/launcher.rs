//! Spawning and signalling host processes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::HOST_TARGET;

const REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Signal used to stop a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// `SIGTERM`, sent by `close_browser`.
    Terminate,
    /// `SIGKILL`, sent on teardown.
    Kill,
}

impl StopSignal {
    fn as_nix(self) -> Signal {
        match self {
            Self::Terminate => Signal::SIGTERM,
            Self::Kill => Signal::SIGKILL,
        }
    }
}

impl fmt::Display for StopSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_nix().as_str())
    }
}

/// Seam between managed-program bookkeeping and the operating system.
pub trait ProcessLauncher: Send + Sync {
    /// Starts `program` with `args` and returns its process identifier.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while spawning.
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<u32>;

    /// Delivers `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by `kill(2)`, or `ESRCH` without signalling
    /// when `pid` belongs to a child of this launcher that already exited.
    fn signal(&self, pid: u32, signal: StopSignal) -> Result<(), Errno>;

    /// Whether `pid` is a child of this launcher that has exited and been
    /// reaped, so its number may now belong to an unrelated process.
    ///
    /// Launchers that do not track their children report `false`.
    fn has_exited(&self, pid: u32) -> bool {
        let _ = pid;
        false
    }
}

#[derive(Debug, Default)]
struct Children {
    running: HashMap<u32, Child>,
    exited: HashSet<u32>,
}

impl Children {
    /// Reaps `pid` if it has finished. Returns `true` once it is no longer
    /// running.
    fn reap(&mut self, pid: u32) -> bool {
        let status = match self.running.get_mut(&pid) {
            Some(child) => child.try_wait(),
            None => return true,
        };
        match status {
            Ok(None) => return false,
            Ok(Some(status)) => debug!(target: HOST_TARGET, pid, %status, "managed process exited"),
            Err(error) => warn!(target: HOST_TARGET, pid, %error, "failed to reap managed process"),
        }
        self.running.remove(&pid);
        self.exited.insert(pid);
        true
    }
}

/// Launcher backed by `std::process::Command` and `kill(2)`.
///
/// Children run detached from the daemon's standard streams. A reaper thread
/// polls each child so it never lingers as a zombie. Signals to a child are
/// sent under the same lock after checking it is still running, so a reaped
/// PID is never signalled.
#[derive(Debug, Default, Clone)]
pub struct SystemLauncher {
    children: Arc<Mutex<Children>>,
}

impl SystemLauncher {
    /// Builds a launcher with no children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Children> {
        self.children
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn start_reaper(&self, pid: u32) {
        let children = Arc::clone(&self.children);
        let reaper = thread::Builder::new()
            .name(format!("pcctld-reap-{pid}"))
            .spawn(move || {
                loop {
                    let finished = children
                        .lock()
                        .unwrap_or_else(|poison| poison.into_inner())
                        .reap(pid);
                    if finished {
                        break;
                    }
                    thread::sleep(REAP_INTERVAL);
                }
            });
        if let Err(error) = reaper {
            warn!(target: HOST_TARGET, pid, %error, "failed to start reaper thread");
        }
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<u32> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id();
        {
            let mut children = self.lock();
            children.exited.remove(&pid);
            children.running.insert(pid, child);
        }
        self.start_reaper(pid);
        Ok(pid)
    }

    fn signal(&self, pid: u32, signal: StopSignal) -> Result<(), Errno> {
        let raw = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
        if raw <= 0 {
            return Err(Errno::EINVAL);
        }
        let mut children = self.lock();
        if children.exited.contains(&pid)
            || (children.running.contains_key(&pid) && children.reap(pid))
        {
            return Err(Errno::ESRCH);
        }
        kill(Pid::from_raw(raw), signal.as_nix())
    }

    fn has_exited(&self, pid: u32) -> bool {
        self.lock().exited.contains(&pid)
    }
}
