//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::audit::{self, AuditLog};
use crate::bootstrap::{ConfigLoader, DaemonParts, SystemConfigLoader, bootstrap_with};
use crate::cancel::CancelToken;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::host::{ProcessLauncher, SystemLauncher};
use crate::pipeline::{Dispatcher, Pipeline, PipelineSettings};
use crate::queue::RequestQueue;
use crate::transport::{CommandEndpoint, EndpointSettings};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) shutdown: S,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) launcher: Arc<dyn ProcessLauncher>,
    pub(crate) cancel: CancelToken,
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, socket setup, accepting a client or
/// the pipeline fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        shutdown: SystemShutdownSignal,
        reporter: Arc::new(StructuredHealthReporter::new()),
        launcher: Arc::new(SystemLauncher::new()),
        cancel: CancelToken::new(),
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        shutdown,
        reporter,
        launcher,
        cancel,
    } = plan;

    let daemon = bootstrap_with(&loader, Arc::clone(&reporter), launcher)?;
    let DaemonParts {
        config,
        audit,
        registry,
        program,
    } = daemon.into_parts();
    audit::install_default(Arc::clone(&audit));
    info!(target: PROCESS_TARGET, "starting daemon runtime");
    audit.info("Starting PC control daemon");

    let queue = Arc::new(RequestQueue::new());
    let mut endpoint = CommandEndpoint::bind(
        EndpointSettings::from_config(&config)?,
        Arc::clone(&queue),
        Arc::clone(&audit),
    )?;
    reporter.endpoint_listening(endpoint.local_addr());
    shutdown.install(&cancel)?;

    let result = match endpoint.accept_connection(&cancel) {
        Ok(Some(peer)) => {
            reporter.peer_connected(peer);
            let pipeline = Pipeline {
                endpoint,
                dispatcher: Dispatcher::new(queue, registry, Arc::clone(&audit)),
                reporter: Arc::clone(&reporter),
                audit: Arc::clone(&audit),
                settings: PipelineSettings::from_config(&config),
            };
            serve(pipeline, &cancel, reporter.as_ref())
        }
        Ok(None) => {
            reporter.shutdown_requested();
            Ok(())
        }
        Err(error) => Err(error.into()),
    };

    program.kill_remaining();
    finish(&audit, &result);
    result
}

fn serve(
    pipeline: Pipeline,
    cancel: &CancelToken,
    reporter: &dyn HealthReporter,
) -> Result<(), LaunchError> {
    let handle = pipeline.start(cancel)?;
    cancel.wait();
    reporter.shutdown_requested();
    handle.join()?;
    Ok(())
}

fn finish(audit: &AuditLog, result: &Result<(), LaunchError>) {
    match result {
        Ok(()) => {
            info!(target: PROCESS_TARGET, "shutdown sequence completed");
            audit.info("PC control daemon stopped");
        }
        Err(error) => {
            audit.critical(format_args!("PC control daemon stopped: {error}"));
        }
    }
}
