//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

use pcctl_config::{Config, LoadResult};

use crate::bootstrap::ConfigLoader;

/// Loader binding loopback on an ephemeral port, with files in a temp dir and
/// loop timings short enough for tests.
pub struct TestConfigLoader {
    dir: TempDir,
    overrides: Box<dyn Fn(&mut Config) + Send + Sync>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::with_overrides(|_| {})
    }

    /// Applies `overrides` on top of the test defaults.
    #[must_use]
    pub fn with_overrides(overrides: impl Fn(&mut Config) + Send + Sync + 'static) -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
            overrides: Box::new(overrides),
        }
    }

    fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name))
            .expect("temporary path was not valid UTF-8")
    }

    /// Location of the PID file used by loaded configurations.
    #[must_use]
    pub fn pid_file(&self) -> Utf8PathBuf {
        self.path("ProcessID.pid")
    }

    /// Location of the audit file used by loaded configurations.
    #[must_use]
    pub fn audit_file(&self) -> Utf8PathBuf {
        self.path("pcctld.log")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> LoadResult {
        let mut config = Config {
            listen_host: "127.0.0.1".to_owned(),
            listen_port: 0,
            receive_timeout_ms: 50,
            ingest_interval_ms: 10,
            dispatch_interval_ms: 10,
            startup_delay_ms: 20,
            failure_pause_ms: 20,
            audit_level: pcctl_config::Severity::Debug,
            audit_file: self.audit_file(),
            audit_quiet: true,
            pid_file: self.pid_file(),
            ..Config::default()
        };
        (self.overrides)(&mut config);
        Ok(config)
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> LoadResult {
        let args = vec![
            OsString::from("pcctld"),
            OsString::from("--listen-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
