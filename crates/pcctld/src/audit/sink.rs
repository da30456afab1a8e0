//! Console and file destinations for audit records.
//!
//! Sinks are only ever touched while the audit lock is held, so they carry no
//! synchronisation of their own.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::AUDIT_TARGET;
use super::record::LogRecord;

/// Echoes records to a writer, stdout in production.
pub(super) struct ConsoleSink {
    enabled: bool,
    writer: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub(super) fn stdout(enabled: bool) -> Self {
        Self::with_writer(enabled, Box::new(io::stdout()))
    }

    pub(super) fn with_writer(enabled: bool, writer: Box<dyn Write + Send>) -> Self {
        Self { enabled, writer }
    }

    pub(super) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(super) fn emit(&mut self, record: &LogRecord) {
        if !self.enabled {
            return;
        }
        let written = writeln!(self.writer, "{record}").and_then(|()| self.writer.flush());
        if let Err(error) = written {
            warn!(target: AUDIT_TARGET, %error, "console sink write failed");
        }
    }
}

/// Appends records to a file, flushing after every line.
#[derive(Debug, Default)]
pub(super) struct FileSink {
    enabled: bool,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl FileSink {
    /// Closes any open file and opens `path` in append mode.
    ///
    /// The sink stays disabled when the file cannot be opened.
    pub(super) fn open(&mut self, path: &Path) -> bool {
        self.file = None;
        self.path = Some(path.to_path_buf());
        self.file = open_append(path);
        self.enabled = self.file.is_some();
        self.enabled
    }

    /// Reopens the previously configured path unless a file is already open.
    pub(super) fn reopen(&mut self) -> bool {
        if self.file.is_none() {
            self.file = self.path.as_deref().and_then(open_append);
        }
        self.enabled = self.file.is_some();
        self.enabled
    }

    pub(super) fn disable(&mut self) {
        self.enabled = false;
        self.file = None;
    }

    pub(super) fn is_active(&self) -> bool {
        self.enabled && self.file.is_some()
    }

    pub(super) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(super) fn emit(&mut self, record: &LogRecord) {
        if !self.enabled {
            return;
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let written = writeln!(file, "{record}").and_then(|()| file.flush());
        if let Err(error) = written {
            warn!(
                target: AUDIT_TARGET,
                %error,
                path = ?self.path,
                "file sink write failed"
            );
        }
    }
}

fn open_append(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(error) => {
            warn!(
                target: AUDIT_TARGET,
                %error,
                path = %path.display(),
                "unable to open audit log file"
            );
            None
        }
    }
}
