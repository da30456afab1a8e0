use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::severity::Severity;

/// Address the command endpoint binds to; every IPv4 interface.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// TCP port the command endpoint listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Pending-connection backlog handed to `listen(2)`.
pub const DEFAULT_BACKLOG: u32 = 3;

/// Capacity of a single receive call in bytes.
pub const DEFAULT_RECEIVE_BUFFER_BYTES: usize = 1024;

/// Read timeout on the peer socket so the ingestion loop can observe shutdown.
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 500;

/// Cadence of the ingestion loop.
pub const DEFAULT_INGEST_INTERVAL_MS: u64 = 500;

/// Cadence of the dispatch loop.
pub const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 1000;

/// Delay between starting ingestion and starting dispatch.
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;

/// Pause applied after a loop iteration fails.
pub const DEFAULT_FAILURE_PAUSE_MS: u64 = 1000;

/// File receiving audit records.
pub const DEFAULT_AUDIT_FILE: &str = "pcctld.log";

/// Program launched by `open_browser`.
pub const DEFAULT_BROWSER_PROGRAM: &str = "firefox";

/// File holding the PID of the last launched program.
pub const DEFAULT_PID_FILE: &str = "ProcessID.pid";

/// Default telemetry filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default telemetry filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned telemetry filter, for places that need an allocation.
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default telemetry output format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default minimum audit severity.
pub fn default_audit_level() -> Severity {
    Severity::Info
}

/// Default listen host as an owned string.
pub fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Default audit file path.
pub fn default_audit_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_AUDIT_FILE)
}

/// Default managed program.
pub fn default_browser_program() -> String {
    DEFAULT_BROWSER_PROGRAM.to_owned()
}

/// Default PID file path.
pub fn default_pid_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PID_FILE)
}
