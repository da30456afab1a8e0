//! Thread-safe, level-filtered audit log with an in-memory history.
//!
//! Every operation on an [`AuditLog`] runs under one mutex, so records from the
//! ingestion and dispatch loops reach the history and both sinks in a single
//! total order. Records below the minimum severity are rejected before the
//! message is formatted.

mod default;
mod errors;
mod record;
mod sink;

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use time::{OffsetDateTime, UtcOffset};

use pcctl_config::{Config, Severity};

pub use default::{default_log, install_default};
pub use errors::DumpError;
pub use record::LogRecord;

use sink::{ConsoleSink, FileSink};

pub(crate) const AUDIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::audit");

const HISTORY_HEADER: &str = "=== LOG BUFFER CONTENTS ===";
const HISTORY_FOOTER: &str = "=== END LOG BUFFER ===";

struct AuditState {
    minimum: Severity,
    history: Vec<LogRecord>,
    console: ConsoleSink,
    file: FileSink,
}

/// Shared audit log.
///
/// Cloneable handles are obtained by wrapping the log in an
/// [`Arc`](std::sync::Arc); the log itself is never copied.
pub struct AuditLog {
    offset: UtcOffset,
    state: Mutex<AuditState>,
}

impl AuditLog {
    /// Builds a log with the given minimum level, echoing to stdout when
    /// `console` is set and with the file sink disabled.
    #[must_use]
    pub fn new(minimum: Severity, console: bool) -> Self {
        Self::with_console(minimum, ConsoleSink::stdout(console))
    }

    /// Builds a log whose console sink writes to `writer`.
    #[must_use]
    pub fn with_console_writer(minimum: Severity, writer: Box<dyn Write + Send>) -> Self {
        Self::with_console(minimum, ConsoleSink::with_writer(true, writer))
    }

    fn with_console(minimum: Severity, console: ConsoleSink) -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Self {
            offset,
            state: Mutex::new(AuditState {
                minimum,
                history: Vec::new(),
                console,
                file: FileSink::default(),
            }),
        }
    }

    /// Builds the daemon's log from configuration.
    ///
    /// A log file that cannot be opened leaves the file sink disabled; the
    /// failure is reported through telemetry.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let log = Self::new(config.audit_level(), config.audit_console());
        if let Some(path) = config.audit_file() {
            log.set_file_sink(true, Some(path.as_std_path()));
        }
        log
    }

    fn lock(&self) -> MutexGuard<'_, AuditState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Records `message` at `level` unless it falls below the minimum.
    pub fn log(&self, level: Severity, message: impl fmt::Display) {
        let mut state = self.lock();
        if level < state.minimum {
            return;
        }
        let timestamp = OffsetDateTime::now_utc().to_offset(self.offset);
        let record = LogRecord::new(timestamp, level, message.to_string());
        state.console.emit(&record);
        state.file.emit(&record);
        state.history.push(record);
    }

    /// Records at [`Severity::Debug`].
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    /// Records at [`Severity::Info`].
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    /// Records at [`Severity::Warning`].
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Severity::Warning, message);
    }

    /// Records at [`Severity::Error`].
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }

    /// Records at [`Severity::Critical`].
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Severity::Critical, message);
    }

    /// Current minimum severity.
    #[must_use]
    pub fn minimum_level(&self) -> Severity {
        self.lock().minimum
    }

    /// Changes the minimum severity for subsequent records.
    pub fn set_minimum_level(&self, level: Severity) {
        self.lock().minimum = level;
    }

    /// Reconfigures the file sink and reports whether it is now writing.
    ///
    /// With `enabled` and a non-empty `path` any open file is closed and `path`
    /// is opened for appending. With `enabled` and no path the previously
    /// configured file is reopened if it is not already open. Disabling closes
    /// the file.
    pub fn set_file_sink(&self, enabled: bool, path: Option<&Path>) -> bool {
        let mut state = self.lock();
        if !enabled {
            state.file.disable();
            return false;
        }
        match path.filter(|candidate| !candidate.as_os_str().is_empty()) {
            Some(path) => state.file.open(path),
            None => state.file.reopen(),
        }
    }

    /// Enables or disables the console echo.
    pub fn set_console_sink(&self, enabled: bool) {
        self.lock().console.set_enabled(enabled);
    }

    /// Copies the accepted records in submission order.
    #[must_use]
    pub fn snapshot_history(&self) -> Vec<LogRecord> {
        self.lock().history.clone()
    }

    /// Drops every record from the history. Sinks are unaffected.
    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    /// Appends every history record to `path`, one line each.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError`] when the file cannot be opened or written; records
    /// written before the failure stay in the file.
    pub fn dump_history_to(&self, path: &Path) -> Result<usize, DumpError> {
        let state = self.lock();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| DumpError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let mut writer = BufWriter::new(file);
        for (written, record) in state.history.iter().enumerate() {
            writeln!(writer, "{record}").map_err(|source| DumpError::Write {
                path: path.to_path_buf(),
                written,
                source,
            })?;
        }
        let total = state.history.len();
        writer.flush().map_err(|source| DumpError::Write {
            path: path.to_path_buf(),
            written: total,
            source,
        })?;
        Ok(total)
    }

    /// Renders the history between banner lines, one record per line.
    #[must_use]
    pub fn render_history(&self) -> String {
        let state = self.lock();
        let mut rendered = String::from(HISTORY_HEADER);
        rendered.push('\n');
        for record in &state.history {
            rendered.push_str(&record.to_string());
            rendered.push('\n');
        }
        rendered.push_str(HISTORY_FOOTER);
        rendered.push('\n');
        rendered
    }

    /// Point-in-time summary of the log's configuration and size.
    #[must_use]
    pub fn statistics(&self) -> AuditStats {
        let state = self.lock();
        AuditStats {
            records: state.history.len(),
            minimum: state.minimum,
            console: state.console.is_enabled(),
            file: state.file.is_active(),
        }
    }

    /// Path last given to the file sink, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<std::path::PathBuf> {
        self.lock().file.path().map(Path::to_path_buf)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Severity::Info, true)
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuditLog")
            .field("offset", &self.offset)
            .field("stats", &self.statistics())
            .finish()
    }
}

/// Snapshot returned by [`AuditLog::statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStats {
    /// Records currently held in the history.
    pub records: usize,
    /// Minimum accepted severity.
    pub minimum: Severity,
    /// Whether the console echo is enabled.
    pub console: bool,
    /// Whether a log file is open and receiving records.
    pub file: bool,
}

impl fmt::Display for AuditStats {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "=== LOGGER STATISTICS ===")?;
        writeln!(formatter, "Buffer size: {} entries", self.records)?;
        writeln!(formatter, "Current log level: {}", self.minimum)?;
        writeln!(formatter, "Console output: {}", on_off(self.console))?;
        writeln!(formatter, "File output: {}", on_off(self.file))?;
        write!(formatter, "=========================")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}
