//! Unit tests for the command registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mockall::mock;
use pcctl_config::Severity;
use rstest::{fixture, rstest};

use super::*;

mock! {
    Action {}
    impl CommandAction for Action {
        fn run(&self) -> Result<(), ActionError>;
    }
}

fn noop() -> Result<(), ActionError> {
    Ok(())
}

struct Harness {
    audit: Arc<AuditLog>,
    registry: CommandRegistry,
}

#[fixture]
fn harness() -> Harness {
    let audit = Arc::new(AuditLog::new(Severity::Debug, false));
    let registry = CommandRegistry::new(Arc::clone(&audit));
    Harness { audit, registry }
}

#[rstest]
fn dispatch_runs_the_bound_action(mut harness: Harness) {
    let mut action = MockAction::new();
    action.expect_run().once().returning(|| Ok(()));
    harness.registry.register(OPEN_BROWSER, action);

    let outcome = harness.registry.dispatch(OPEN_BROWSER).expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Executed);
}

#[rstest]
fn unknown_command_writes_one_error_and_runs_nothing(mut harness: Harness) {
    let mut action = MockAction::new();
    action.expect_run().never();
    harness.registry.register(OPEN_BROWSER, action);

    let outcome = harness.registry.dispatch("reboot").expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Unhandled);
    let history = harness.audit.snapshot_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].level(), Severity::Error);
    assert_eq!(history[0].message(), "No handler found for request: reboot");
}

#[rstest]
fn names_are_case_sensitive(mut harness: Harness) {
    harness.registry.register(CLOSE_BROWSER, noop);

    assert!(harness.registry.contains(CLOSE_BROWSER));
    assert_eq!(
        harness.registry.dispatch("CLOSE_BROWSER").expect("dispatch"),
        DispatchOutcome::Unhandled
    );
}

#[rstest]
fn duplicate_registration_replaces_the_binding(mut harness: Harness) {
    let first_runs = Arc::new(AtomicUsize::new(0));
    let second_runs = Arc::new(AtomicUsize::new(0));
    let first = Arc::clone(&first_runs);
    let second = Arc::clone(&second_runs);

    assert!(
        harness
            .registry
            .register("ping", move || -> Result<(), ActionError> {
                first.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .is_none()
    );
    assert!(
        harness
            .registry
            .register("ping", move || -> Result<(), ActionError> {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .is_some()
    );
    harness.registry.dispatch("ping").expect("dispatch");

    assert_eq!(harness.registry.len(), 1);
    assert_eq!(first_runs.load(Ordering::SeqCst), 0);
    assert_eq!(second_runs.load(Ordering::SeqCst), 1);
}

#[rstest]
fn action_failures_propagate_unchanged(mut harness: Harness) {
    let mut action = MockAction::new();
    action
        .expect_run()
        .once()
        .returning(|| Err(ActionError::failed("display unavailable")));
    harness.registry.register("broken", action);

    let error = harness.registry.dispatch("broken").expect_err("failure");

    assert!(matches!(error, ActionError::Failed { ref message } if message == "display unavailable"));
    assert!(harness.audit.snapshot_history().is_empty());
}

#[rstest]
fn names_are_listed_in_order(mut harness: Harness) {
    harness.registry.register(OPEN_BROWSER, noop);
    harness.registry.register(CLOSE_BROWSER, noop);

    assert_eq!(harness.registry.names(), [CLOSE_BROWSER, OPEN_BROWSER]);
}
