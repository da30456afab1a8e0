//! Defines the unified error surface for daemon launch and supervision.

use thiserror::Error;

use pcctl_config::ConfigError;

use crate::bootstrap::BootstrapError;
use crate::pipeline::PipelineError;
use crate::transport::EndpointError;

use super::shutdown::ShutdownError;

/// Errors that stop the daemon with a nonzero exit status.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Endpoint settings could not be derived from configuration.
    #[error("invalid endpoint settings: {source}")]
    Settings {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// The command endpoint could not be set up or accept a client.
    #[error("command endpoint failed: {source}")]
    Endpoint {
        /// Underlying endpoint error.
        #[source]
        source: EndpointError,
    },
    /// The ingestion or dispatch loop failed.
    #[error("command pipeline failed: {source}")]
    Pipeline {
        /// Underlying pipeline error.
        #[source]
        source: PipelineError,
    },
    /// Installing the shutdown listener failed.
    #[error("failed to install shutdown listener: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ConfigError> for LaunchError {
    fn from(source: ConfigError) -> Self {
        Self::Settings { source }
    }
}

impl From<EndpointError> for LaunchError {
    fn from(source: EndpointError) -> Self {
        Self::Endpoint { source }
    }
}

impl From<PipelineError> for LaunchError {
    fn from(source: PipelineError) -> Self {
        match source {
            PipelineError::Ingestion(source) => Self::Endpoint { source },
            other => Self::Pipeline { source: other },
        }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
