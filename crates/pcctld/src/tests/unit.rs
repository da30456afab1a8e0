//! Unit tests for bootstrap and the daemon lifecycle.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use pcctl_config::Severity;
use rstest::rstest;
use signal_hook::consts::signal::SIGHUP;
use signal_hook::low_level::raise;

use crate::audit::{self, AuditLog};
use crate::bootstrap::bootstrap_with;
use crate::cancel::CancelToken;
use crate::commands::{ActionError, CLOSE_BROWSER, OPEN_BROWSER};
use crate::process::{LaunchError, ShutdownSignal, SystemShutdownSignal};
use crate::process::launch::{LaunchPlan, run_daemon_with};

use super::support::{
    DEFAULT_AUDIT_GUARD, FailingConfigLoader, HealthEvent, RecordingHealthReporter,
    RecordingLauncher, RecordingShutdown, TestConfigLoader, wait_until,
};

fn lock_screen() -> Result<(), ActionError> {
    Ok(())
}

#[rstest]
fn bootstrap_registers_the_browser_commands() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone(), Arc::new(RecordingLauncher::default()))
        .expect("bootstrap should succeed");

    assert_eq!(daemon.registry().names(), [CLOSE_BROWSER, OPEN_BROWSER]);
    assert_eq!(daemon.program().program(), "firefox");
    assert_eq!(daemon.program().pid_file().path(), loader.pid_file());
    let events = reporter.events();
    assert!(events.contains(&HealthEvent::BootstrapStarting));
    assert!(events.contains(&HealthEvent::BootstrapSucceeded));
}

#[rstest]
fn bootstrap_opens_the_configured_audit_file() {
    let loader = TestConfigLoader::new();
    let daemon = bootstrap_with(
        &loader,
        Arc::new(RecordingHealthReporter::default()),
        Arc::new(RecordingLauncher::default()),
    )
    .expect("bootstrap should succeed");

    daemon.audit().info("hello from bootstrap");

    let contents = std::fs::read_to_string(loader.audit_file()).expect("audit file exists");
    assert!(contents.contains("[INFO] hello from bootstrap"));
    assert!(daemon.audit().statistics().file);
}

#[rstest]
fn extra_commands_can_be_registered_before_serving() {
    let mut daemon = bootstrap_with(
        &TestConfigLoader::new(),
        Arc::new(RecordingHealthReporter::default()),
        Arc::new(RecordingLauncher::default()),
    )
    .expect("bootstrap should succeed");

    assert!(daemon.register_command("lock_screen", lock_screen).is_none());
    let parts = daemon.into_parts();

    assert!(parts.registry.contains("lock_screen"));
    assert_eq!(parts.registry.len(), 3);
}

#[rstest]
fn bootstrap_reports_loader_failures() {
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(
        &FailingConfigLoader,
        reporter.clone(),
        Arc::new(RecordingLauncher::default()),
    )
    .err()
    .expect("bootstrap should fail");

    assert!(matches!(error, crate::BootstrapError::Configuration { .. }));
    assert_eq!(
        reporter.count(|event| matches!(event, HealthEvent::BootstrapFailed(_))),
        1
    );
}

#[rstest]
fn bootstrap_rejects_invalid_values() {
    let loader = TestConfigLoader::with_overrides(|config| config.receive_buffer_bytes = 0);

    let error = bootstrap_with(
        &loader,
        Arc::new(RecordingHealthReporter::default()),
        Arc::new(RecordingLauncher::default()),
    )
    .err()
    .expect("bootstrap should fail");

    assert!(matches!(error, crate::BootstrapError::Validation { .. }));
}

#[rstest]
fn daemon_stops_cleanly_when_cancelled_before_a_client_arrives() {
    let _guard = DEFAULT_AUDIT_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
    let cancel = CancelToken::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = RecordingShutdown::default();
    let plan = LaunchPlan {
        loader: TestConfigLoader::new(),
        shutdown: shutdown.clone(),
        reporter: reporter.clone(),
        launcher: Arc::new(RecordingLauncher::default()),
        cancel: cancel.clone(),
    };

    let runner = thread::spawn(move || run_daemon_with(plan));
    assert!(wait_until(|| shutdown.installed()));
    cancel.cancel();

    runner.join().expect("daemon thread").expect("clean shutdown");
    assert!(reporter.events().contains(&HealthEvent::ShutdownRequested));
}

#[rstest]
fn occupied_port_fails_the_launch() {
    let _guard = DEFAULT_AUDIT_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
    let occupant = TcpListener::bind("127.0.0.1:0").expect("bind occupant");
    let port = occupant.local_addr().expect("occupant address").port();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let plan = LaunchPlan {
        loader: TestConfigLoader::with_overrides(move |config| config.listen_port = port),
        shutdown: RecordingShutdown::default(),
        reporter: reporter.clone(),
        launcher: Arc::new(RecordingLauncher::default()),
        cancel: CancelToken::new(),
    };

    let error = run_daemon_with(plan).expect_err("bind should fail");

    assert!(matches!(error, LaunchError::Endpoint { .. }));
    assert!(reporter.listening_address().is_none());
}

#[rstest]
fn connected_peer_is_reported() {
    let _guard = DEFAULT_AUDIT_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
    let cancel = CancelToken::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let plan = LaunchPlan {
        loader: TestConfigLoader::new(),
        shutdown: RecordingShutdown::default(),
        reporter: reporter.clone(),
        launcher: Arc::new(RecordingLauncher::default()),
        cancel: cancel.clone(),
    };

    let runner = thread::spawn(move || run_daemon_with(plan));
    assert!(wait_until(|| reporter.listening_address().is_some()));
    let address = reporter.listening_address().expect("listening address");
    let client = TcpStream::connect(address).expect("connect");
    assert!(wait_until(|| {
        reporter.count(|event| matches!(event, HealthEvent::PeerConnected(_))) == 1
    }));
    cancel.cancel();

    runner.join().expect("daemon thread").expect("clean shutdown");
    drop(client);
    assert!(reporter.count(|event| matches!(event, HealthEvent::PeerReleased(_))) >= 1);
}

#[rstest]
fn shutdown_signal_cancels_and_reaches_the_default_audit_log() {
    let _guard = DEFAULT_AUDIT_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
    let log = Arc::new(AuditLog::new(Severity::Info, false));
    let previous = audit::install_default(Arc::clone(&log));
    let cancel = CancelToken::new();

    SystemShutdownSignal
        .install(&cancel)
        .expect("signal listener installs");
    raise(SIGHUP).expect("raise SIGHUP");

    assert!(wait_until(|| cancel.is_cancelled()));
    assert!(wait_until(|| !log.snapshot_history().is_empty()));
    let messages: Vec<String> = log
        .snapshot_history()
        .iter()
        .map(|record| record.message().to_owned())
        .collect();
    assert_eq!(messages, vec!["Received SIGHUP, shutting down".to_owned()]);
    audit::install_default(previous);
}
