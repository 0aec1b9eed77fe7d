//! Incomplete deployment reporting.

use crate::dependency::{DeploymentContext, MissingDependency};
use crate::errors::{DeployflowError, DeploymentError};
use crate::stages::Stage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A deployment whose last forward step failed.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    /// The deployment (top-level unit) name.
    pub deployment: String,
    /// The unit whose deployer failed.
    pub unit: String,
    /// The last stage the deployment fully reached.
    pub stage: Stage,
    /// The stage the deployment was asked to reach.
    pub requested: Stage,
    /// The stage being entered when the failure happened.
    pub failed_stage: Stage,
    /// The full error message.
    pub message: String,
    /// The innermost cause.
    pub root_cause: String,
    /// The error itself.
    #[serde(skip)]
    pub error: DeploymentError,
}

/// A deployment held short of its requested stage.
#[derive(Debug, Clone, Serialize)]
pub struct BlockedUnit {
    /// The deployment (top-level unit) name.
    pub deployment: String,
    /// The stage it reached.
    pub stage: Stage,
    /// The stage it was asked to reach.
    pub requested: Stage,
    /// The dependencies that held it back.
    pub missing: Vec<MissingDependency>,
}

/// Every deployment of a batch that did not reach its requested stage.
///
/// Built once from tracker state and never changed afterwards. Entries are
/// keyed and ordered by deployment name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncompleteDeploymentReport {
    failures: BTreeMap<String, UnitFailure>,
    blocked: BTreeMap<String, BlockedUnit>,
}

impl IncompleteDeploymentReport {
    /// Builds a report from deployment contexts. Complete ones are skipped.
    pub fn from_contexts<'a>(contexts: impl IntoIterator<Item = &'a DeploymentContext>) -> Self {
        let mut report = Self::default();
        for context in contexts {
            report.record(context);
        }
        report
    }

    fn record(&mut self, context: &DeploymentContext) {
        let name = context.name().to_string();
        if let Some(error) = context.error() {
            self.failures.insert(
                name.clone(),
                UnitFailure {
                    deployment: name,
                    unit: error.unit.clone(),
                    stage: context.stage().clone(),
                    requested: context.requested().clone(),
                    failed_stage: error.stage.clone(),
                    message: error.to_string(),
                    root_cause: error.root_cause(),
                    error: error.clone(),
                },
            );
        } else if context.stage() != context.requested() {
            self.blocked.insert(
                name.clone(),
                BlockedUnit {
                    deployment: name,
                    stage: context.stage().clone(),
                    requested: context.requested().clone(),
                    missing: context.waiting_on().to_vec(),
                },
            );
        }
    }

    /// Returns true if every deployment reached its requested stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.blocked.is_empty()
    }

    /// Returns the failed deployments.
    #[must_use]
    pub const fn failures(&self) -> &BTreeMap<String, UnitFailure> {
        &self.failures
    }

    /// Returns the blocked deployments.
    #[must_use]
    pub const fn blocked(&self) -> &BTreeMap<String, BlockedUnit> {
        &self.blocked
    }

    /// Returns the names of failed deployments.
    #[must_use]
    pub fn failed_units(&self) -> Vec<&str> {
        self.failures.keys().map(String::as_str).collect()
    }

    /// Returns the names of blocked deployments.
    #[must_use]
    pub fn blocked_units(&self) -> Vec<&str> {
        self.blocked.keys().map(String::as_str).collect()
    }

    /// Serializes the report.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, DeployflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for IncompleteDeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Incomplete Deployment listing:")?;
        if !self.blocked.is_empty() {
            write!(f, "\n\nDEPLOYMENTS MISSING DEPENDENCIES:")?;
            for blocked in self.blocked.values() {
                if blocked.missing.is_empty() {
                    write!(
                        f,
                        "\n  Deployment \"{}\" stopped at {} (requested {})",
                        blocked.deployment, blocked.stage, blocked.requested
                    )?;
                    continue;
                }
                write!(
                    f,
                    "\n  Deployment \"{}\" is missing the following dependencies:",
                    blocked.deployment
                )?;
                for missing in &blocked.missing {
                    write!(f, "\n    {missing}")?;
                }
            }
        }
        if !self.failures.is_empty() {
            write!(f, "\n\nDEPLOYMENTS IN ERROR:")?;
            for failure in self.failures.values() {
                write!(
                    f,
                    "\n  Deployment \"{}\" is in error due to the following reason(s): {}",
                    failure.deployment, failure.root_cause
                )?;
            }
        }
        Ok(())
    }
}
