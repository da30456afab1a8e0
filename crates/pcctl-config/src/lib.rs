//! Shared configuration for the `pcctld` remote-control daemon.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then a TOML
//! file named by `--config-path` or `PCCTL_CONFIG_PATH`, then `PCCTL_*`
//! environment variables, then command-line flags. Accessors hand out typed
//! values (durations, socket addresses) so the daemon never deals with raw
//! millisecond counts.

mod defaults;
mod logging;
mod severity;

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_AUDIT_FILE, DEFAULT_BACKLOG, DEFAULT_BROWSER_PROGRAM, DEFAULT_DISPATCH_INTERVAL_MS,
    DEFAULT_FAILURE_PAUSE_MS, DEFAULT_INGEST_INTERVAL_MS, DEFAULT_LISTEN_HOST,
    DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, DEFAULT_PID_FILE, DEFAULT_RECEIVE_BUFFER_BYTES,
    DEFAULT_RECEIVE_TIMEOUT_MS, DEFAULT_STARTUP_DELAY_MS, default_audit_file,
    default_audit_level, default_browser_program, default_listen_host, default_log_filter,
    default_log_filter_string, default_log_format, default_pid_file,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use severity::{Severity, SeverityParseError};

/// Daemon configuration resolved from defaults, file, environment and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PCCTL")]
pub struct Config {
    /// IPv4 address the command endpoint binds to.
    #[ortho_config(default = defaults::default_listen_host())]
    pub listen_host: String,
    /// TCP port the command endpoint listens on.
    #[ortho_config(default = 8080)]
    pub listen_port: u16,
    /// Pending-connection backlog.
    #[ortho_config(default = 3)]
    pub backlog: u32,
    /// Maximum bytes consumed by one receive call.
    #[ortho_config(default = 1024)]
    pub receive_buffer_bytes: usize,
    /// Peer read timeout in milliseconds; zero blocks indefinitely.
    #[ortho_config(default = 500)]
    pub receive_timeout_ms: u64,
    /// Ingestion loop cadence in milliseconds.
    #[ortho_config(default = 500)]
    pub ingest_interval_ms: u64,
    /// Dispatch loop cadence in milliseconds.
    #[ortho_config(default = 1000)]
    pub dispatch_interval_ms: u64,
    /// Delay between starting ingestion and dispatch, in milliseconds.
    #[ortho_config(default = 1000)]
    pub startup_delay_ms: u64,
    /// Pause after a failed loop iteration, in milliseconds.
    #[ortho_config(default = 1000)]
    pub failure_pause_ms: u64,
    /// Minimum severity recorded by the audit log.
    #[ortho_config(default = defaults::default_audit_level())]
    pub audit_level: Severity,
    /// Audit log file; an empty path disables the file sink.
    #[ortho_config(default = defaults::default_audit_file())]
    pub audit_file: Utf8PathBuf,
    /// Suppress the stdout echo of audit records.
    ///
    /// Expressed as an opt-out so an absent command-line flag keeps the
    /// console sink enabled.
    #[ortho_config(default = false)]
    pub audit_quiet: bool,
    /// Program launched by `open_browser`.
    #[ortho_config(default = defaults::default_browser_program())]
    pub browser_program: String,
    /// Extra arguments passed to the launched program.
    #[serde(default)]
    pub browser_args: Vec<String>,
    /// File persisting the PID of the last launched program.
    #[ortho_config(default = defaults::default_pid_file())]
    pub pid_file: Utf8PathBuf,
    /// Telemetry filter expression understood by `tracing-subscriber`.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Telemetry output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

/// Result type returned by the configuration loaders.
pub type LoadResult = Result<Config, Arc<OrthoError>>;

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: DEFAULT_LISTEN_PORT,
            backlog: DEFAULT_BACKLOG,
            receive_buffer_bytes: DEFAULT_RECEIVE_BUFFER_BYTES,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            ingest_interval_ms: DEFAULT_INGEST_INTERVAL_MS,
            dispatch_interval_ms: DEFAULT_DISPATCH_INTERVAL_MS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            failure_pause_ms: DEFAULT_FAILURE_PAUSE_MS,
            audit_level: default_audit_level(),
            audit_file: default_audit_file(),
            audit_quiet: false,
            browser_program: default_browser_program(),
            browser_args: Vec::new(),
            pid_file: default_pid_file(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Resolves the IPv4 socket address of the command endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ListenHost`] when `listen_host` is not an IPv4
    /// literal.
    pub fn listen_address(&self) -> Result<SocketAddrV4, ConfigError> {
        let host = self
            .listen_host
            .parse::<Ipv4Addr>()
            .map_err(|source| ConfigError::ListenHost {
                host: self.listen_host.clone(),
                source,
            })?;
        Ok(SocketAddrV4::new(host, self.listen_port))
    }

    /// Pending-connection backlog.
    #[must_use]
    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    /// Capacity of a single receive call.
    #[must_use]
    pub fn receive_buffer_bytes(&self) -> usize {
        self.receive_buffer_bytes
    }

    /// Peer read timeout, or `None` when reads should block indefinitely.
    #[must_use]
    pub fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
    }

    /// Ingestion loop cadence.
    #[must_use]
    pub fn ingest_interval(&self) -> Duration {
        Duration::from_millis(self.ingest_interval_ms)
    }

    /// Dispatch loop cadence.
    #[must_use]
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Delay between starting the ingestion and dispatch loops.
    #[must_use]
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Pause applied after a failed loop iteration.
    #[must_use]
    pub fn failure_pause(&self) -> Duration {
        Duration::from_millis(self.failure_pause_ms)
    }

    /// Minimum audit severity.
    #[must_use]
    pub fn audit_level(&self) -> Severity {
        self.audit_level
    }

    /// Audit file path, or `None` when the file sink is disabled.
    #[must_use]
    pub fn audit_file(&self) -> Option<&Utf8Path> {
        (!self.audit_file.as_str().is_empty()).then_some(self.audit_file.as_path())
    }

    /// Whether audit records are echoed to stdout.
    #[must_use]
    pub fn audit_console(&self) -> bool {
        !self.audit_quiet
    }

    /// Program launched by `open_browser`.
    #[must_use]
    pub fn browser_program(&self) -> &str {
        &self.browser_program
    }

    /// Arguments passed to the launched program.
    #[must_use]
    pub fn browser_args(&self) -> &[String] {
        &self.browser_args
    }

    /// PID persistence file.
    #[must_use]
    pub fn pid_file(&self) -> &Utf8Path {
        self.pid_file.as_path()
    }

    /// Telemetry filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Telemetry output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Rejects values the daemon cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_address()?;
        if self.backlog == 0 {
            return Err(ConfigError::ZeroValue { field: "backlog" });
        }
        if self.receive_buffer_bytes == 0 {
            return Err(ConfigError::ZeroValue {
                field: "receive_buffer_bytes",
            });
        }
        let intervals = [
            ("ingest_interval_ms", self.ingest_interval_ms),
            ("dispatch_interval_ms", self.dispatch_interval_ms),
        ];
        if let Some((field, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue { field: *field });
        }
        if self.browser_program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }
        Ok(())
    }
}

/// Semantic errors in an otherwise well-formed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `listen_host` is not an IPv4 literal.
    #[error("listen host '{host}' is not an IPv4 address: {source}")]
    ListenHost {
        /// Offending host text.
        host: String,
        /// Parser failure.
        #[source]
        source: std::net::AddrParseError,
    },
    /// A field that must be positive was zero.
    #[error("configuration field '{field}' must be greater than zero")]
    ZeroValue {
        /// Name of the field.
        field: &'static str,
    },
    /// No program is configured for `open_browser`.
    #[error("browser program must not be empty")]
    EmptyProgram,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(
            config.listen_address().expect("default host parses"),
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080)
        );
        assert_eq!(config.backlog(), 3);
        assert_eq!(config.ingest_interval(), Duration::from_millis(500));
        assert_eq!(config.dispatch_interval(), Duration::from_secs(1));
        assert_eq!(config.audit_level(), Severity::Info);
        assert_eq!(config.pid_file().as_str(), "ProcessID.pid");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_audit_file_disables_the_sink() {
        let config = Config {
            audit_file: Utf8PathBuf::new(),
            ..Config::default()
        };
        assert!(config.audit_file().is_none());
    }

    #[test]
    fn quiet_flag_disables_the_console_echo() {
        let config = Config {
            audit_quiet: true,
            ..Config::default()
        };
        assert!(!config.audit_console());
        assert!(Config::default().audit_console());
    }

    #[test]
    fn zero_receive_timeout_blocks_indefinitely() {
        let config = Config {
            receive_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.receive_timeout().is_none());
    }

    #[rstest]
    #[case::backlog(Config { backlog: 0, ..Config::default() }, "backlog")]
    #[case::buffer(Config { receive_buffer_bytes: 0, ..Config::default() }, "receive_buffer_bytes")]
    #[case::dispatch(Config { dispatch_interval_ms: 0, ..Config::default() }, "dispatch_interval_ms")]
    fn validate_rejects_zero_values(#[case] config: Config, #[case] expected: &str) {
        match config.validate() {
            Err(ConfigError::ZeroValue { field }) => assert_eq!(field, expected),
            other => panic!("expected zero-value error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_hostnames() {
        let config = Config {
            listen_host: "localhost".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ListenHost { .. })
        ));
    }
}
