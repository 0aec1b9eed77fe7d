//! Test fixtures for controller testing.

use std::sync::Arc;

use super::mocks::{CallLog, FailingDeployer, RecordingDeployer};
use crate::config::ControllerConfig;
use crate::controller::DeploymentController;
use crate::deployers::{Deployer, DeployerRegistry};
use crate::errors::DeployflowError;
use crate::events::{CollectingEventSink, EventSink};
use crate::stages::Stage;

/// A registry, a call log and an event sink shared by the mocks.
#[derive(Debug, Clone)]
pub struct TestFixture {
    /// Log every mock deployer writes to.
    pub log: CallLog,
    /// The registry handed to controllers.
    pub registry: Arc<DeployerRegistry>,
    /// Collected controller events.
    pub events: Arc<CollectingEventSink>,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Creates a fixture over the standard stage table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: CallLog::new(),
            registry: Arc::new(DeployerRegistry::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Registers a deployer.
    ///
    /// # Errors
    ///
    /// Returns the registry's validation error.
    pub fn register(&self, deployer: impl Deployer + 'static) -> Result<(), DeployflowError> {
        self.registry.add_deployer(Arc::new(deployer))?;
        Ok(())
    }

    /// Registers a recording deployer with default placement.
    ///
    /// # Errors
    ///
    /// Returns the registry's validation error.
    pub fn recording(&self, name: &str, stage: Stage) -> Result<(), DeployflowError> {
        self.register(RecordingDeployer::new(name, stage, &self.log))
    }

    /// Registers a failing deployer and returns a handle to toggle it.
    ///
    /// # Errors
    ///
    /// Returns the registry's validation error.
    pub fn failing(
        &self,
        name: &str,
        stage: Stage,
        unit: Option<&str>,
    ) -> Result<Arc<FailingDeployer>, DeployflowError> {
        let mut deployer = FailingDeployer::new(name, stage, &self.log);
        if let Some(unit) = unit {
            deployer = deployer.for_unit(unit);
        }
        let deployer = Arc::new(deployer);
        self.registry
            .add_deployer(Arc::clone(&deployer) as Arc<dyn Deployer>)?;
        Ok(deployer)
    }

    /// Builds a controller over the fixture's registry and event sink.
    ///
    /// # Errors
    ///
    /// Returns the builder's configuration error.
    pub fn controller(&self, config: ControllerConfig) -> Result<DeploymentController, DeployflowError> {
        DeploymentController::builder(Arc::clone(&self.registry))
            .with_config(config)
            .with_event_sink(Arc::clone(&self.events) as Arc<dyn EventSink>)
            .build()
    }
}
