//! Controller configuration.

use crate::errors::DeployflowError;
use serde::{Deserialize, Serialize};

/// Configuration for a [`DeploymentController`](crate::controller::DeploymentController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Name of the stage new deployments are driven to.
    #[serde(default = "default_target")]
    pub default_target: String,
    /// Whether `deploy`/`undeploy` fail when the deployment falls short.
    #[serde(default = "default_true")]
    pub error_on_incomplete: bool,
    /// Upper bound on passes in one batch.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    /// Whether lifecycle events are sent to the event sink.
    #[serde(default = "default_true")]
    pub emit_events: bool,
}

fn default_target() -> String {
    "Installed".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_passes() -> usize {
    10_000
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
            error_on_incomplete: default_true(),
            max_passes: default_max_passes(),
            emit_events: default_true(),
        }
    }
}

impl ControllerConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default target stage name.
    #[must_use]
    pub fn with_default_target(mut self, stage: impl Into<String>) -> Self {
        self.default_target = stage.into();
        self
    }

    /// Sets whether `deploy`/`undeploy` check completeness.
    #[must_use]
    pub fn with_error_on_incomplete(mut self, strict: bool) -> Self {
        self.error_on_incomplete = strict;
        self
    }

    /// Sets the pass limit.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Enables or disables events.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> Result<Self, DeployflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that do not depend on the stage table.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty target name or a zero pass limit.
    pub fn validate(&self) -> Result<(), DeployflowError> {
        if self.default_target.trim().is_empty() {
            return Err(DeployflowError::Config(
                "default_target cannot be empty".to_string(),
            ));
        }
        if self.max_passes == 0 {
            return Err(DeployflowError::Config(
                "max_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
