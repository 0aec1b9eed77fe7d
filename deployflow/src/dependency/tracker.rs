//! Per-deployment stage tracking and dependency resolution.

use super::{DependencyItem, MissingDependency};
use crate::errors::{DeployflowError, DeploymentError};
use crate::stages::{Stage, StageTable};
use crate::units::{UnitArena, UnitId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The state a unit is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum UnitState {
    /// The unit has fully entered this stage.
    At(Stage),
    /// A deploy step failed; the unit holds the last stage it reached.
    Error(Stage),
}

impl UnitState {
    /// Returns the last stage the unit fully reached.
    #[must_use]
    pub const fn stage(&self) -> &Stage {
        match self {
            Self::At(stage) | Self::Error(stage) => stage,
        }
    }

    /// Returns true for the error state.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(stage) => write!(f, "{stage}"),
            Self::Error(stage) => write!(f, "Error (at {stage})"),
        }
    }
}

/// Tracking state for one deployment tree.
///
/// The whole tree shares the top-level unit's stage.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    root: UnitId,
    name: String,
    stage: Stage,
    requested: Stage,
    error: Option<DeploymentError>,
    waiting_on: Vec<MissingDependency>,
    removing: bool,
}

impl DeploymentContext {
    /// Returns the top-level unit handle.
    #[must_use]
    pub const fn root(&self) -> UnitId {
        self.root
    }

    /// Returns the deployment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage the tree has fully reached.
    #[must_use]
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Returns the stage the tree should be moved to.
    #[must_use]
    pub const fn requested(&self) -> &Stage {
        &self.requested
    }

    /// Returns the recorded deploy failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&DeploymentError> {
        self.error.as_ref()
    }

    /// Returns the dependencies that held the tree back at the last check.
    #[must_use]
    pub fn waiting_on(&self) -> &[MissingDependency] {
        &self.waiting_on
    }

    /// Returns true once the deployment has been scheduled for removal.
    #[must_use]
    pub const fn is_removing(&self) -> bool {
        self.removing
    }

    /// Returns the tracked state.
    #[must_use]
    pub fn state(&self) -> UnitState {
        if self.error.is_some() {
            UnitState::Error(self.stage.clone())
        } else {
            UnitState::At(self.stage.clone())
        }
    }

    /// Returns true if the tree sits at its requested stage without error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.stage == self.requested
    }
}

/// Outcome of asking whether a context may take its next forward step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The step into this stage may run.
    Ready(Stage),
    /// Dependencies are unresolved.
    Blocked(Vec<MissingDependency>),
    /// Nothing to do: at or above the requested stage, or in error.
    Idle,
}

/// Tracks the stage of every deployment and decides which steps may run.
#[derive(Debug)]
pub struct DependencyTracker {
    stages: Arc<StageTable>,
    contexts: HashMap<UnitId, DeploymentContext>,
    order: Vec<UnitId>,
}

impl DependencyTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(stages: Arc<StageTable>) -> Self {
        Self {
            stages,
            contexts: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Starts tracking a deployment at the floor.
    pub fn register(&mut self, root: UnitId, name: impl Into<String>, requested: Stage) {
        let context = DeploymentContext {
            root,
            name: name.into(),
            stage: self.stages.floor().clone(),
            requested,
            error: None,
            waiting_on: Vec::new(),
            removing: false,
        };
        self.contexts.insert(root, context);
        self.order.push(root);
    }

    /// Stops tracking a deployment.
    pub fn unregister(&mut self, root: UnitId) -> Option<DeploymentContext> {
        self.order.retain(|id| *id != root);
        self.contexts.remove(&root)
    }

    /// Returns the context of a deployment.
    #[must_use]
    pub fn context(&self, root: UnitId) -> Option<&DeploymentContext> {
        self.contexts.get(&root)
    }

    /// Returns tracked roots in registration order.
    #[must_use]
    pub fn roots(&self) -> &[UnitId] {
        &self.order
    }

    /// Returns every context in registration order.
    pub fn contexts(&self) -> impl Iterator<Item = &DeploymentContext> {
        self.order.iter().filter_map(|id| self.contexts.get(id))
    }

    /// Sets the requested stage. Clears any recorded error so the next
    /// batch makes a fresh attempt. Deployments scheduled for removal keep
    /// heading for the floor.
    pub fn request(&mut self, root: UnitId, stage: Stage) {
        if let Some(context) = self.contexts.get_mut(&root).filter(|c| !c.removing) {
            context.requested = stage;
            context.error = None;
            context.waiting_on.clear();
        }
    }

    /// Restores a requested stage without touching the error state.
    pub(crate) fn restore_request(&mut self, root: UnitId, stage: Stage) {
        if let Some(context) = self.contexts.get_mut(&root) {
            context.requested = stage;
        }
    }

    /// Schedules a deployment for removal: its requested stage drops to the
    /// floor.
    pub fn mark_removing(&mut self, root: UnitId) {
        let floor = self.stages.floor().clone();
        if let Some(context) = self.contexts.get_mut(&root) {
            context.removing = true;
            context.requested = floor;
            context.waiting_on.clear();
        }
    }

    /// Records a deploy failure.
    pub fn mark_error(&mut self, root: UnitId, error: DeploymentError) {
        if let Some(context) = self.contexts.get_mut(&root) {
            context.error = Some(error);
            context.waiting_on.clear();
        }
    }

    /// Records the dependencies a context is parked on. Returns true if the
    /// set changed.
    pub fn set_waiting(&mut self, root: UnitId, missing: Vec<MissingDependency>) -> bool {
        match self.contexts.get_mut(&root) {
            Some(context) if context.waiting_on != missing => {
                context.waiting_on = missing;
                true
            }
            _ => false,
        }
    }

    /// Moves a context one stage up.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `stage` is not the immediate successor.
    pub fn mark_advanced(&mut self, root: UnitId, stage: &Stage) -> Result<(), DeployflowError> {
        let context = self.context_mut(root)?;
        if stage.index() != context.stage.index() + 1 {
            return Err(DeployflowError::Internal(format!(
                "'{}' cannot advance from {} to {}",
                context.name, context.stage, stage
            )));
        }
        context.stage = stage.clone();
        context.waiting_on.clear();
        Ok(())
    }

    /// Moves a context one stage down.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `stage` is not the immediate predecessor.
    pub fn mark_retreated(&mut self, root: UnitId, stage: &Stage) -> Result<(), DeployflowError> {
        let context = self.context_mut(root)?;
        if stage.index() + 1 != context.stage.index() {
            return Err(DeployflowError::Internal(format!(
                "'{}' cannot retreat from {} to {}",
                context.name, context.stage, stage
            )));
        }
        context.stage = stage.clone();
        Ok(())
    }

    fn context_mut(&mut self, root: UnitId) -> Result<&mut DeploymentContext, DeployflowError> {
        self.contexts
            .get_mut(&root)
            .ok_or_else(|| DeployflowError::Internal(format!("no context for unit {root}")))
    }

    /// Checks a single item against the current state.
    ///
    /// # Errors
    ///
    /// Returns the unresolved item as a `MissingDependency`.
    pub fn resolve_item(
        &self,
        units: &UnitArena,
        item: &DependencyItem,
    ) -> Result<(), MissingDependency> {
        let target = units
            .by_name(&item.depends_on)
            .and_then(|unit| self.contexts.get(&unit.top()));
        let missing = |actual_state: Option<Stage>, target_in_error: bool| MissingDependency {
            dependent: item.dependent.clone(),
            depends_on: item.depends_on.clone(),
            when_required: item.when_required.clone(),
            required_state: item.required_state.clone(),
            actual_state,
            target_in_error,
        };

        let Some(target) = target else {
            return Err(missing(None, false));
        };
        if target.error.is_some() {
            return Err(missing(Some(target.stage.clone()), true));
        }
        match self.stages.resolve(&item.required_state) {
            Ok(required) if target.stage >= required => Ok(()),
            _ => Err(missing(Some(target.stage.clone()), false)),
        }
    }

    /// Decides whether a context may take its next forward step.
    ///
    /// Every item declared in the tree whose `when_required` is at or below
    /// the next stage must be resolved.
    #[must_use]
    pub fn check_advance(&self, units: &UnitArena, root: UnitId) -> Advance {
        let Some(context) = self.contexts.get(&root) else {
            return Advance::Idle;
        };
        if context.error.is_some() || context.stage >= context.requested {
            return Advance::Idle;
        }
        let Some(next) = self.stages.successor(&context.stage).cloned() else {
            return Advance::Idle;
        };

        let missing: Vec<MissingDependency> = self
            .tree_items(units, root)
            .into_iter()
            .filter(|item| self.applies_from(item) <= next)
            .filter_map(|item| self.resolve_item(units, item).err())
            .collect();

        if missing.is_empty() {
            Advance::Ready(next)
        } else {
            Advance::Blocked(missing)
        }
    }

    /// Returns the contexts that must drop below a stage before `root`
    /// leaves `new_stage + 1`, with the stage each must retreat to.
    ///
    /// A context is listed when it holds an item on a unit of `root`'s tree
    /// that would become unresolved and it has already entered the item's
    /// `when_required` stage.
    #[must_use]
    pub fn dependents_to_retreat(
        &self,
        units: &UnitArena,
        root: UnitId,
        new_stage: &Stage,
    ) -> Vec<(UnitId, Stage)> {
        let mut result: Vec<(UnitId, Stage)> = Vec::new();
        for dependent in &self.order {
            if *dependent == root {
                continue;
            }
            let Some(context) = self.contexts.get(dependent) else {
                continue;
            };
            for item in self.tree_items(units, *dependent) {
                let on_root = units
                    .by_name(&item.depends_on)
                    .is_some_and(|unit| unit.top() == root);
                if !on_root {
                    continue;
                }
                let Ok(required) = self.stages.resolve(&item.required_state) else {
                    continue;
                };
                let when = self.applies_from(item);
                if required <= *new_stage || context.stage < when {
                    continue;
                }
                let Some(target) = self.stages.predecessor(&when).cloned() else {
                    continue;
                };
                match result.iter_mut().find(|(id, _)| id == dependent) {
                    Some((_, existing)) if target < *existing => *existing = target,
                    Some(_) => {}
                    None => result.push((*dependent, target)),
                }
            }
        }
        result
    }

    /// Returns the first stage an item must hold for. A `when_required`
    /// outside the table holds from the first step off the floor.
    fn applies_from(&self, item: &DependencyItem) -> Stage {
        self.stages
            .resolve(&item.when_required)
            .ok()
            .or_else(|| self.stages.successor(self.stages.floor()).cloned())
            .unwrap_or_else(|| self.stages.floor().clone())
    }

    fn tree_items<'a>(&self, units: &'a UnitArena, root: UnitId) -> Vec<&'a DependencyItem> {
        units
            .tree(root)
            .into_iter()
            .filter_map(|id| units.get(id))
            .flat_map(|unit| unit.dependencies().items())
            .collect()
    }
}
