//! The program started and stopped by the built-in commands.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use nix::errno::Errno;
use tracing::{debug, warn};

use pcctl_config::Config;

use crate::audit::AuditLog;
use crate::commands::{ActionError, CLOSE_BROWSER, CommandRegistry, OPEN_BROWSER};

use super::HOST_TARGET;
use super::launcher::{ProcessLauncher, StopSignal};
use super::pid_file::PidFile;

/// Tracks the last launched instance of a configured program.
///
/// The in-memory PID wins over the persisted copy; the file is only consulted
/// when the daemon has not launched anything since it started. A remembered
/// PID whose process the launcher has reaped is forgotten together with the
/// file, since the number may already belong to another process. Dropping the
/// value sends `SIGKILL` to a still-remembered process.
pub struct ManagedProgram {
    program: String,
    args: Vec<String>,
    pid_file: PidFile,
    launcher: Arc<dyn ProcessLauncher>,
    audit: Arc<AuditLog>,
    current: Mutex<Option<u32>>,
}

impl ManagedProgram {
    /// Builds a program handle with nothing launched yet.
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        pid_file: PidFile,
        launcher: Arc<dyn ProcessLauncher>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            pid_file,
            launcher,
            audit,
            current: Mutex::new(None),
        }
    }

    /// Builds the handle described by the daemon configuration.
    #[must_use]
    pub fn from_config(
        config: &Config,
        launcher: Arc<dyn ProcessLauncher>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self::new(
            config.browser_program(),
            config.browser_args().to_vec(),
            PidFile::new(config.pid_file()),
            launcher,
            audit,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Option<u32>> {
        self.current
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Program name as configured.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// PID file backing the in-memory handle.
    #[must_use]
    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// PID remembered from the last successful launch, while that process
    /// is still running.
    #[must_use]
    pub fn current_pid(&self) -> Option<u32> {
        let mut current = self.lock();
        let pid = (*current)?;
        if !self.launcher.has_exited(pid) {
            return Some(pid);
        }
        *current = None;
        drop(current);
        self.audit
            .info(format_args!("{} (PID {pid}) has exited", self.program));
        self.remove_pid_file();
        None
    }

    /// Starts the program, remembering and persisting its PID.
    ///
    /// When the PID cannot be persisted the child is sent `SIGTERM` and
    /// forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Spawn`] when the program cannot be started and
    /// [`ActionError::PidFile`] when its PID cannot be persisted.
    pub fn launch(&self) -> Result<u32, ActionError> {
        self.audit.info(format_args!("Launching {}", self.program));
        let pid = match self.launcher.spawn(&self.program, &self.args) {
            Ok(pid) => pid,
            Err(source) => {
                self.audit
                    .error(format_args!("Failed to launch {}: {source}", self.program));
                self.audit.error(format_args!(
                    "Make sure {} is installed and in your PATH",
                    self.program
                ));
                return Err(ActionError::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };
        *self.lock() = Some(pid);

        if let Err(error) = self.pid_file.write(pid) {
            self.audit
                .error(format_args!("Unable to persist process ID {pid}: {error}"));
            if let Err(errno) = self.launcher.signal(pid, StopSignal::Terminate) {
                warn!(target: HOST_TARGET, pid, %errno, "failed to stop unpersisted process");
            }
            *self.lock() = None;
            return Err(error.into());
        }

        self.audit
            .info(format_args!("{} opened with PID: {pid}", self.program));
        Ok(pid)
    }

    /// Sends `SIGTERM` to the remembered process, falling back to the PID file.
    ///
    /// Returns the signalled PID, or `None` after writing one ERROR record when
    /// no PID is known. A process that already exited is reported as a
    /// WARNING and still counts as terminated.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Signal`] when `kill(2)` fails for any reason
    /// other than a missing process.
    pub fn terminate(&self) -> Result<Option<u32>, ActionError> {
        self.audit
            .info(format_args!("Attempting to close {}", self.program));
        let remembered = self.current_pid();
        let pid = match remembered {
            Some(pid) => pid,
            None => match self.pid_file.read() {
                Ok(Some(pid)) => pid,
                Ok(None) => {
                    self.audit.error(format_args!(
                        "Unable to determine {} process ID",
                        self.program
                    ));
                    return Ok(None);
                }
                Err(error) => {
                    self.audit.error(format_args!(
                        "Unable to determine {} process ID: {error}",
                        self.program
                    ));
                    return Ok(None);
                }
            },
        };

        match self.launcher.signal(pid, StopSignal::Terminate) {
            Ok(()) => debug!(target: HOST_TARGET, pid, "sent SIGTERM"),
            Err(Errno::ESRCH) => self
                .audit
                .warning(format_args!("Process {pid} is no longer running")),
            Err(source) => return Err(ActionError::Signal { pid, source }),
        }
        self.forget(pid);
        Ok(Some(pid))
    }

    fn forget(&self, pid: u32) {
        {
            let mut current = self.lock();
            if *current == Some(pid) {
                *current = None;
            }
        }
        self.remove_pid_file();
    }

    fn remove_pid_file(&self) {
        if let Err(error) = self.pid_file.remove() {
            warn!(target: HOST_TARGET, %error, "failed to remove process ID file");
        }
    }

    /// Sends `SIGKILL` to a remembered process and forgets it.
    pub fn kill_remaining(&self) {
        let Some(pid) = self.lock().take() else {
            return;
        };
        match self.launcher.signal(pid, StopSignal::Kill) {
            Ok(()) | Err(Errno::ESRCH) => {
                debug!(target: HOST_TARGET, pid, "managed process stopped on teardown");
            }
            Err(errno) => {
                warn!(target: HOST_TARGET, pid, %errno, "failed to kill managed process");
            }
        }
    }
}

impl Drop for ManagedProgram {
    fn drop(&mut self) {
        self.kill_remaining();
    }
}

impl fmt::Debug for ManagedProgram {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ManagedProgram")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("pid_file", &self.pid_file)
            .field("current", &*self.lock())
            .finish_non_exhaustive()
    }
}

/// Binds `open_browser` and `close_browser` to `program`.
pub fn register_browser_commands(registry: &mut CommandRegistry, program: &Arc<ManagedProgram>) {
    let opener = Arc::clone(program);
    registry.register(OPEN_BROWSER, move || opener.launch().map(|_| ()));
    let closer = Arc::clone(program);
    registry.register(CLOSE_BROWSER, move || closer.terminate().map(|_| ()));
}
