//! Daemon assembly: configuration, telemetry, audit log and commands.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use pcctl_config::{Config, ConfigError, LoadResult};

use crate::audit::AuditLog;
use crate::commands::{CommandAction, CommandRegistry};
use crate::health::HealthReporter;
use crate::host::{ManagedProgram, ProcessLauncher, register_browser_commands};
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration can be produced.
    fn load(&self) -> LoadResult;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> LoadResult {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> LoadResult {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Components produced by a successful bootstrap.
pub struct Daemon {
    config: Config,
    audit: Arc<AuditLog>,
    registry: CommandRegistry,
    program: Arc<ManagedProgram>,
}

/// A bootstrapped daemon taken apart for the runtime.
pub struct DaemonParts {
    /// Validated configuration.
    pub config: Config,
    /// Audit log shared by every component.
    pub audit: Arc<AuditLog>,
    /// Frozen command table.
    pub registry: Arc<CommandRegistry>,
    /// Program driven by the built-in commands.
    pub program: Arc<ManagedProgram>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared audit log.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Program driven by the built-in commands.
    #[must_use]
    pub fn program(&self) -> &Arc<ManagedProgram> {
        &self.program
    }

    /// Registry holding the built-in commands.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Adds or replaces a command before the daemon starts serving.
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        action: impl CommandAction + 'static,
    ) -> Option<Arc<dyn CommandAction>> {
        self.registry.register(name, action)
    }

    /// Freezes the registry and hands out the runtime components.
    #[must_use]
    pub fn into_parts(self) -> DaemonParts {
        DaemonParts {
            config: self.config,
            audit: self.audit,
            registry: Arc::new(self.registry),
            program: self.program,
        }
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration cannot be loaded or
/// validated, or telemetry cannot be installed. The reporter observes the
/// failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    launcher: Arc<dyn ProcessLauncher>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.validate() {
        let error = BootstrapError::Validation { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    if let Err(source) = telemetry::initialise(&config) {
        let error = BootstrapError::Telemetry { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let audit = Arc::new(AuditLog::from_config(&config));
    let program = Arc::new(ManagedProgram::from_config(
        &config,
        launcher,
        Arc::clone(&audit),
    ));
    let mut registry = CommandRegistry::new(Arc::clone(&audit));
    register_browser_commands(&mut registry, &program);

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        audit,
        registry,
        program,
    })
}

