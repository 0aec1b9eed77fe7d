//! Testing utilities for deployment controllers.
//!
//! This module provides:
//! - Recording and failing mock deployers with a shared call log
//! - Assertions over controller state
//! - A fixture wiring a registry, a log and a controller together

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_blocked, assert_complete, assert_in_error, assert_stage};
pub use fixtures::TestFixture;
pub use mocks::{Action, Call, CallLog, FailingDeployer, RecordingDeployer};
