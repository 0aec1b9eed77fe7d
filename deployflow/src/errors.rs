//! Error types for the deployflow controller.
//!
//! Configuration problems (bad stage tables, bad deployer registrations) are
//! reported eagerly. Deploy-step failures are recorded per unit and only
//! surface as an error when the caller asks for strict completion.

use crate::controller::IncompleteDeploymentReport;
use crate::stages::Stage;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for deployflow operations.
#[derive(Debug, Error)]
pub enum DeployflowError {
    /// A deployer failed while deploying a unit.
    #[error("{0}")]
    Deployment(#[from] DeploymentError),

    /// One or more units did not reach their requested stage.
    #[error("{0}")]
    Incomplete(#[from] IncompleteDeploymentError),

    /// A stage name did not resolve against the stage table.
    #[error("{0}")]
    UnknownStage(#[from] UnknownStageError),

    /// The stage table could not be built.
    #[error("{0}")]
    StageTable(#[from] StageTableError),

    /// A deployer registration was rejected.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// A deployment or unit with this name is already known.
    #[error("Deployment '{0}' already exists")]
    DuplicateDeployment(String),

    /// No deployment or unit with this name is known.
    #[error("Unknown deployment: {0}")]
    UnknownDeployment(String),

    /// The deployment tree handed to the controller is malformed.
    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),

    /// Controller configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A controller invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error raised when a deployer's `deploy` fails for a unit at a stage.
///
/// The cause is shared so the error can live both in the unit's state and in
/// any report built from it.
#[derive(Debug, Clone)]
pub struct DeploymentError {
    /// The unit being deployed when the failure happened.
    pub unit: String,
    /// The stage the unit was entering.
    pub stage: Stage,
    /// The error returned by the deployer.
    pub cause: Arc<anyhow::Error>,
}

impl DeploymentError {
    /// Creates a new deployment error.
    #[must_use]
    pub fn new(unit: impl Into<String>, stage: Stage, cause: anyhow::Error) -> Self {
        Self {
            unit: unit.into(),
            stage,
            cause: Arc::new(cause),
        }
    }

    /// Returns the innermost error message of the cause chain.
    #[must_use]
    pub fn root_cause(&self) -> String {
        self.cause.root_cause().to_string()
    }
}

impl fmt::Display for DeploymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error deploying '{}' at stage {}: {}",
            self.unit, self.stage, self.cause
        )
    }
}

impl std::error::Error for DeploymentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&**self.cause)
    }
}

/// Error raised when a batch leaves requested units short of their stage.
#[derive(Debug, Clone, Error)]
#[error("{report}")]
pub struct IncompleteDeploymentError {
    /// Every unit that failed or stayed blocked.
    pub report: IncompleteDeploymentReport,
}

impl IncompleteDeploymentError {
    /// Wraps a report.
    #[must_use]
    pub fn new(report: IncompleteDeploymentReport) -> Self {
        Self { report }
    }
}

/// Error raised when a stage name is not part of the stage table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stage: '{name}'")]
pub struct UnknownStageError {
    /// The name that failed to resolve.
    pub name: String,
}

impl UnknownStageError {
    /// Creates a new unknown stage error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Errors raised while building a stage table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageTableError {
    /// A stage was given an empty or whitespace-only name.
    #[error("Stage name cannot be empty")]
    EmptyName,

    /// The same stage name appears twice.
    #[error("Duplicate stage name: '{0}'")]
    Duplicate(String),

    /// `stage_after`/`stage_before` referenced a stage that is not in the table.
    #[error("Cannot position stage '{stage}' relative to unknown stage '{anchor}'")]
    UnknownAnchor {
        /// The stage being inserted.
        stage: String,
        /// The missing anchor.
        anchor: String,
    },

    /// Nothing may be inserted before the floor stage.
    #[error("Stage '{0}' cannot be placed before the floor stage")]
    BeforeFloor(String),
}

/// Errors raised when registering deployers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The deployer has an empty name.
    #[error("Deployer name cannot be empty")]
    EmptyName,

    /// Another deployer is already registered under this name.
    #[error("Deployer '{0}' is already registered")]
    DuplicateName(String),

    /// The deployer's stage is not part of the stage table.
    #[error("Deployer '{deployer}' declares unknown stage '{stage}'")]
    UnknownStage {
        /// The deployer name.
        deployer: String,
        /// The stage it declared.
        stage: String,
    },

    /// Deployers cannot run at the floor stage.
    #[error("Deployer '{deployer}' cannot run at the floor stage '{stage}'")]
    FloorStage {
        /// The deployer name.
        deployer: String,
        /// The floor stage name.
        stage: String,
    },

    /// An input or output attachment key is empty.
    #[error("Deployer '{0}' declares an empty attachment key")]
    EmptyAttachmentKey(String),
}
