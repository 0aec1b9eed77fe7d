//! Mock deployers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::deployers::{Deployable, Deployer, StageBound, TypedIo};
use crate::stages::Stage;
use crate::units::{AttachmentKey, DeploymentUnit};

/// Which half of a deployer ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `deploy` succeeded.
    Deploy,
    /// `undeploy` succeeded.
    Undeploy,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Undeploy => write!(f, "undeploy"),
        }
    }
}

/// One recorded deployer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// The deployer name.
    pub deployer: String,
    /// The unit name.
    pub unit: String,
    /// What ran.
    pub action: Action,
}

/// Shared, ordered log of deployer invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&self, deployer: &str, unit: &str, action: Action) {
        self.calls.lock().push(Call {
            deployer: deployer.to_string(),
            unit: unit.to_string(),
            action,
        });
    }

    /// Returns all calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Returns calls rendered as `"<action> <deployer> <unit>"`.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| format!("{} {} {}", c.action, c.deployer, c.unit))
            .collect()
    }

    /// Returns the deployer names of successful deploys, in order.
    #[must_use]
    pub fn deployed(&self) -> Vec<String> {
        self.names_for(Action::Deploy)
    }

    /// Returns the deployer names of successful undeploys, in order.
    #[must_use]
    pub fn undeployed(&self) -> Vec<String> {
        self.names_for(Action::Undeploy)
    }

    fn names_for(&self, action: Action) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.action == action)
            .map(|c| c.deployer.clone())
            .collect()
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[derive(Debug, Clone)]
struct Placement {
    name: String,
    stage: Stage,
    relative_order: i32,
    wants_components: bool,
    outputs: Vec<AttachmentKey>,
}

impl Placement {
    fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            stage,
            relative_order: 0,
            wants_components: false,
            outputs: Vec::new(),
        }
    }
}

/// A deployer that records every successful call.
///
/// Optionally writes an attachment on deploy (removed again on undeploy)
/// and declares a dependency each time it deploys a unit.
#[derive(Debug)]
pub struct RecordingDeployer {
    placement: Placement,
    log: CallLog,
    dependency: Option<(String, Stage, Stage)>,
}

impl RecordingDeployer {
    /// Creates a new recording deployer.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage, log: &CallLog) -> Self {
        Self {
            placement: Placement::new(name, stage),
            log: log.clone(),
            dependency: None,
        }
    }

    /// Sets the relative order.
    #[must_use]
    pub fn with_relative_order(mut self, order: i32) -> Self {
        self.placement.relative_order = order;
        self
    }

    /// Also runs against component units.
    #[must_use]
    pub fn with_components(mut self) -> Self {
        self.placement.wants_components = true;
        self
    }

    /// Writes `key` on deploy.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<AttachmentKey>) -> Self {
        self.placement.outputs.push(key.into());
        self
    }

    /// Declares a dependency on every unit it deploys.
    #[must_use]
    pub fn with_dependency(
        mut self,
        target: impl Into<String>,
        when_required: Stage,
        required_state: Stage,
    ) -> Self {
        self.dependency = Some((target.into(), when_required, required_state));
        self
    }
}

impl StageBound for RecordingDeployer {
    fn stage(&self) -> &Stage {
        &self.placement.stage
    }

    fn relative_order(&self) -> i32 {
        self.placement.relative_order
    }

    fn wants_components(&self) -> bool {
        self.placement.wants_components
    }
}

impl TypedIo for RecordingDeployer {
    fn outputs(&self) -> &[AttachmentKey] {
        &self.placement.outputs
    }
}

#[async_trait]
impl Deployable for RecordingDeployer {
    async fn deploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        for key in &self.placement.outputs {
            unit.attachments_mut()
                .put_named(key.clone(), self.placement.name.clone());
        }
        if let Some((target, when_required, required_state)) = &self.dependency {
            unit.add_dependency(target.clone(), when_required.clone(), required_state.clone());
        }
        self.log
            .record(&self.placement.name, unit.name(), Action::Deploy);
        Ok(())
    }

    async fn undeploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        for key in &self.placement.outputs {
            unit.attachments_mut().remove(key);
        }
        self.log
            .record(&self.placement.name, unit.name(), Action::Undeploy);
        Ok(())
    }
}

impl Deployer for RecordingDeployer {
    fn name(&self) -> &str {
        &self.placement.name
    }
}

/// A deployer that fails on demand.
///
/// By default every `deploy` fails. Failures can be limited to one unit,
/// switched off at runtime, or moved to `undeploy`. Successful calls are
/// recorded like [`RecordingDeployer`]; failed ones are not.
#[derive(Debug)]
pub struct FailingDeployer {
    placement: Placement,
    log: CallLog,
    message: String,
    only_unit: Option<String>,
    fail_deploy: AtomicBool,
    fail_undeploy: bool,
}

impl FailingDeployer {
    /// Creates a deployer whose `deploy` always fails.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage, log: &CallLog) -> Self {
        let placement = Placement::new(name, stage);
        let message = format!("{} failed", placement.name);
        Self {
            placement,
            log: log.clone(),
            message,
            only_unit: None,
            fail_deploy: AtomicBool::new(true),
            fail_undeploy: false,
        }
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Fails only for the named unit.
    #[must_use]
    pub fn for_unit(mut self, unit: impl Into<String>) -> Self {
        self.only_unit = Some(unit.into());
        self
    }

    /// Sets whether `deploy` fails initially.
    #[must_use]
    pub fn with_deploy_failure(self, fail: bool) -> Self {
        self.fail_deploy.store(fail, Ordering::SeqCst);
        self
    }

    /// Makes `undeploy` fail.
    #[must_use]
    pub fn failing_undeploy(mut self) -> Self {
        self.fail_undeploy = true;
        self
    }

    /// Switches deploy failures on or off.
    pub fn set_failing(&self, fail: bool) {
        self.fail_deploy.store(fail, Ordering::SeqCst);
    }

    fn targets(&self, unit: &DeploymentUnit) -> bool {
        self.only_unit
            .as_deref()
            .map_or(true, |name| name == unit.name())
    }
}

impl StageBound for FailingDeployer {
    fn stage(&self) -> &Stage {
        &self.placement.stage
    }

    fn relative_order(&self) -> i32 {
        self.placement.relative_order
    }
}

impl TypedIo for FailingDeployer {}

#[async_trait]
impl Deployable for FailingDeployer {
    async fn deploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        if self.fail_deploy.load(Ordering::SeqCst) && self.targets(unit) {
            anyhow::bail!("{}", self.message);
        }
        self.log
            .record(&self.placement.name, unit.name(), Action::Deploy);
        Ok(())
    }

    async fn undeploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        if self.fail_undeploy && self.targets(unit) {
            anyhow::bail!("{} undeploy failed", self.placement.name);
        }
        self.log
            .record(&self.placement.name, unit.name(), Action::Undeploy);
        Ok(())
    }
}

impl Deployer for FailingDeployer {
    fn name(&self) -> &str {
        &self.placement.name
    }
}
