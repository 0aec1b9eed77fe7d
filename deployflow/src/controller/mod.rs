//! The deployment controller and its completeness report.
//!
//! [`DeploymentController`] owns every deployment tree, tracks the stage
//! each tree has reached and moves trees one stage at a time toward their
//! requested stage. Failures and unmet dependencies are collected into an
//! [`IncompleteDeploymentReport`].

mod main_controller;
mod report;

#[cfg(test)]
mod integration_tests;

pub use main_controller::{ControllerBuilder, DeploymentController};
pub use report::{BlockedUnit, IncompleteDeploymentReport, UnitFailure};
