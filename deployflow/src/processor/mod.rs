//! Single-step deployer execution for one deployment tree.
//!
//! A forward step into a stage runs the stage's deployers against the tree,
//! parent first: each unit, then its components, then its children. A
//! failure unwinds everything this step applied, in reverse, before the
//! error is returned. A backward step undeploys what the forward step
//! recorded, children first.

use crate::deployers::{is_relevant, Deployer, DeployerRegistry};
use crate::errors::DeploymentError;
use crate::stages::Stage;
use crate::units::{UnitArena, UnitId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs deployer chains for single stage steps.
#[derive(Debug, Clone)]
pub struct UnitProcessor {
    registry: Arc<DeployerRegistry>,
}

impl UnitProcessor {
    /// Creates a new processor over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<DeployerRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeployerRegistry> {
        &self.registry
    }

    /// Moves the tree rooted at `root` into `stage`.
    ///
    /// The stage's deployer list is snapshotted once, so registry changes
    /// made while the step runs take effect from the next step.
    /// Returns the number of deployer invocations that succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first deploy failure, after the step has been unwound.
    pub async fn deploy_step(
        &self,
        units: &mut UnitArena,
        root: UnitId,
        stage: &Stage,
    ) -> Result<usize, DeploymentError> {
        let deployers = self.registry.deployers_for_stage(stage);
        let mut stepped: Vec<UnitId> = Vec::new();
        let mut applied = 0;

        for id in units.tree(root) {
            match self.deploy_unit(units, id, stage, &deployers).await {
                Ok(count) => {
                    applied += count;
                    stepped.push(id);
                }
                Err(err) => {
                    for done in stepped.into_iter().rev() {
                        self.undeploy_unit(units, done, stage).await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(applied)
    }

    /// Moves the tree rooted at `root` out of `stage`.
    ///
    /// Undeploys exactly the deployer instances recorded on the way in,
    /// even if they have since left the registry. Undeploy failures are
    /// logged and skipped. Returns the number of undeploy invocations.
    pub async fn undeploy_step(&self, units: &mut UnitArena, root: UnitId, stage: &Stage) -> usize {
        let mut count = 0;
        for id in units.tree(root).into_iter().rev() {
            count += self.undeploy_unit(units, id, stage).await;
        }
        count
    }

    async fn deploy_unit(
        &self,
        units: &mut UnitArena,
        id: UnitId,
        stage: &Stage,
        deployers: &[Arc<dyn Deployer>],
    ) -> Result<usize, DeploymentError> {
        let failure = {
            let Some(unit) = units.get_mut(id) else {
                return Ok(0);
            };
            unit.set_stepping(Some(stage.clone()));
            let mut failure = None;
            for deployer in deployers {
                if !is_relevant(deployer.as_ref(), unit) {
                    continue;
                }
                debug!(deployer = %deployer.name(), unit = %unit.name(), stage = %stage, "Deploying");
                if let Err(cause) = deployer.deploy(unit).await {
                    failure = Some(DeploymentError::new(unit.name(), stage.clone(), cause));
                    break;
                }
                unit.record_applied(stage, Arc::clone(deployer));
            }
            unit.set_stepping(None);
            match failure {
                None => return Ok(unit.applied_at(stage).len()),
                Some(err) => err,
            }
        };

        self.undeploy_unit(units, id, stage).await;
        Err(failure)
    }

    async fn undeploy_unit(&self, units: &mut UnitArena, id: UnitId, stage: &Stage) -> usize {
        let Some(unit) = units.get_mut(id) else {
            return 0;
        };
        let applied = unit.take_applied(stage);
        unit.set_stepping(Some(stage.clone()));
        for deployer in applied.iter().rev() {
            debug!(deployer = %deployer.name(), unit = %unit.name(), stage = %stage, "Undeploying");
            if let Err(err) = deployer.undeploy(unit).await {
                warn!(
                    deployer = %deployer.name(),
                    unit = %unit.name(),
                    stage = %stage,
                    error = %err,
                    "Undeploy failed, continuing"
                );
            }
        }
        unit.set_stepping(None);
        let dropped = unit.drop_dependencies_declared_at(stage);
        if dropped > 0 {
            debug!(unit = %unit.name(), stage = %stage, dropped, "Dropped dependencies");
        }
        applied.len()
    }
}
