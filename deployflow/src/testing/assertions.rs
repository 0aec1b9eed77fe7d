//! Test assertions for controller state.

use crate::controller::DeploymentController;
use crate::stages::Stage;

/// Asserts that a deployment sits at `expected` without error.
pub fn assert_stage(controller: &DeploymentController, name: &str, expected: &Stage) {
    let state = controller.unit_state(name);
    assert!(state.is_some(), "Deployment '{name}' is not tracked");
    if let Some(state) = state {
        assert!(
            !state.is_error() && state.stage() == expected,
            "Expected '{name}' at {expected}, got {state}"
        );
    }
}

/// Asserts that a deployment is in error.
pub fn assert_in_error(controller: &DeploymentController, name: &str) {
    assert!(
        controller.unit_state(name).is_some_and(|s| s.is_error()),
        "Expected '{name}' to be in error, got {:?}",
        controller.unit_state(name)
    );
}

/// Asserts that a deployment is held back by a dependency on `target`.
pub fn assert_blocked(controller: &DeploymentController, name: &str, target: &str) {
    let waiting = controller.waiting_on(name);
    assert!(
        waiting.iter().any(|m| m.depends_on == target),
        "Expected '{name}' to wait on '{target}', waiting on: {:?}",
        waiting.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
}

/// Asserts that every tracked deployment reached its requested stage.
pub fn assert_complete(controller: &DeploymentController) {
    let report = controller.incomplete_report();
    assert!(report.is_empty(), "Expected a complete batch, got:\n{report}");
}
