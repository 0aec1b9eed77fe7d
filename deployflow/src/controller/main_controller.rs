//! The staged deployment controller.

use super::IncompleteDeploymentReport;
use crate::config::ControllerConfig;
use crate::dependency::{
    Advance, DependencyTracker, DeploymentContext, MissingDependency, UnitState,
};
use crate::deployers::DeployerRegistry;
use crate::errors::{DeployflowError, DeploymentError, IncompleteDeploymentError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::processor::UnitProcessor;
use crate::stages::{Stage, StageTable};
use crate::units::{Deployment, DeploymentUnit, UnitArena, UnitId};
use crate::utils::{iso_timestamp, new_batch_id};
use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Counters for one batch.
#[derive(Debug, Clone, Copy, Default)]
struct BatchStats {
    passes: usize,
    advanced: usize,
    retreated: usize,
    failed: usize,
    invocations: usize,
}

/// A deployment taken down by `bounce`, with what to put back.
struct Bounced {
    root: UnitId,
    reached: Stage,
    requested: Stage,
    error: Option<DeploymentError>,
}

/// Builder for [`DeploymentController`].
pub struct ControllerBuilder {
    registry: Arc<DeployerRegistry>,
    config: ControllerConfig,
    events: Arc<dyn EventSink>,
}

impl ControllerBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Builds the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its default
    /// target is not a stage of the registry's table.
    pub fn build(self) -> Result<DeploymentController, DeployflowError> {
        self.config.validate()?;
        let stages = Arc::clone(self.registry.stage_table());
        let default_target = stages.lookup(&self.config.default_target)?;
        Ok(DeploymentController {
            processor: UnitProcessor::new(Arc::clone(&self.registry)),
            tracker: DependencyTracker::new(Arc::clone(&stages)),
            units: UnitArena::new(),
            pending: Vec::new(),
            stages,
            registry: self.registry,
            config: self.config,
            default_target,
            events: self.events,
        })
    }
}

impl fmt::Debug for ControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Drives deployment trees through the stage chain.
///
/// Every batch operation takes `&mut self`, so one batch runs at a time.
/// `add_deployment` and `remove_deployment` only queue work; `process`
/// runs it. `deploy`, `undeploy`, `change` and `bounce` queue and process
/// in one call.
pub struct DeploymentController {
    config: ControllerConfig,
    stages: Arc<StageTable>,
    registry: Arc<DeployerRegistry>,
    processor: UnitProcessor,
    units: UnitArena,
    tracker: DependencyTracker,
    pending: Vec<Deployment>,
    default_target: Stage,
    events: Arc<dyn EventSink>,
}

impl DeploymentController {
    /// Creates a controller with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry's stage table has no `Installed`
    /// stage.
    pub fn new(registry: Arc<DeployerRegistry>) -> Result<Self, DeployflowError> {
        Self::builder(registry).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(registry: Arc<DeployerRegistry>) -> ControllerBuilder {
        ControllerBuilder {
            registry,
            config: ControllerConfig::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the stage table.
    #[must_use]
    pub const fn stages(&self) -> &Arc<StageTable> {
        &self.stages
    }

    /// Returns the deployer registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<DeployerRegistry> {
        &self.registry
    }

    /// Returns the stage new deployments are driven to.
    #[must_use]
    pub const fn default_target(&self) -> &Stage {
        &self.default_target
    }

    // ------------------------------------------------------------------
    // Queueing
    // ------------------------------------------------------------------

    /// Queues a deployment tree for the next batch.
    ///
    /// If a live top-level deployment has the same name, it is scheduled
    /// for removal and replaced once it has been fully undeployed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeployment` for empty names, `DuplicateDeployment`
    /// if any unit name is already live or queued, and `UnknownStage` if a
    /// dependency names a stage outside the controller's table.
    pub fn add_deployment(&mut self, deployment: Deployment) -> Result<(), DeployflowError> {
        let replaced = self
            .units
            .find(deployment.name())
            .filter(|id| self.units.get(*id).is_some_and(DeploymentUnit::is_top_level));
        {
            let replaceable: HashSet<&str> = replaced
                .map(|root| {
                    self.units
                        .tree(root)
                        .into_iter()
                        .filter_map(|id| self.units.get(id))
                        .map(DeploymentUnit::name)
                        .collect()
                })
                .unwrap_or_default();

            let mut seen = HashSet::new();
            for name in deployment.names() {
                if name.trim().is_empty() {
                    return Err(DeployflowError::InvalidDeployment(
                        "unit name cannot be empty".to_string(),
                    ));
                }
                let queued = self.pending.iter().any(|p| p.names().contains(&name));
                let live = self.units.find(name).is_some() && !replaceable.contains(name);
                if queued || live || !seen.insert(name) {
                    return Err(DeployflowError::DuplicateDeployment(name.to_string()));
                }
            }
        }
        for item in deployment.dependency_items() {
            self.stages.resolve(&item.when_required)?;
            self.stages.resolve(&item.required_state)?;
        }

        if let Some(root) = replaced {
            info!(deployment = %deployment.name(), "Scheduling redeploy");
            self.tracker.mark_removing(root);
        }
        debug!(deployment = %deployment.name(), "Queued deployment");
        self.pending.push(deployment);
        Ok(())
    }

    /// Schedules a deployment for removal in the next batch.
    ///
    /// Returns `Ok(false)` if no deployment has this name. A queued
    /// deployment is simply dropped from the queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeployment` if the name belongs to a nested unit.
    pub fn remove_deployment(&mut self, name: &str) -> Result<bool, DeployflowError> {
        if let Some(pos) = self.pending.iter().position(|d| d.name() == name) {
            self.pending.remove(pos);
            debug!(deployment = %name, "Dropped queued deployment");
            return Ok(true);
        }
        let Some(unit) = self.units.by_name(name) else {
            return Ok(false);
        };
        if !unit.is_top_level() {
            return Err(DeployflowError::InvalidDeployment(format!(
                "'{name}' is not a top-level deployment"
            )));
        }
        let root = unit.id();
        self.tracker.mark_removing(root);
        debug!(deployment = %name, "Scheduled removal");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Runs one batch: pending removals, pending additions, and every
    /// deployment's move toward its requested stage.
    ///
    /// Deploy failures and unmet dependencies do not fail the batch; they
    /// show up in [`DeploymentController::check_complete`].
    ///
    /// # Errors
    ///
    /// Returns an error if a queued deployment could not be materialized or
    /// a tracker invariant was violated.
    pub async fn process(&mut self) -> Result<(), DeployflowError> {
        let batch_id = new_batch_id();
        let span = info_span!("batch", id = %batch_id);
        self.run_batch().instrument(span).await
    }

    async fn run_batch(&mut self) -> Result<(), DeployflowError> {
        let mut stats = BatchStats::default();
        self.run_passes(&mut stats).await?;
        self.sweep_removed().await;
        let rejected = self.materialize_pending().await;
        self.run_passes(&mut stats).await?;

        info!(
            passes = stats.passes,
            advanced = stats.advanced,
            retreated = stats.retreated,
            failed = stats.failed,
            invocations = stats.invocations,
            "Batch completed"
        );
        self.emit(
            events::BATCH_COMPLETED,
            json!({
                "passes": stats.passes,
                "advanced": stats.advanced,
                "retreated": stats.retreated,
                "failed": stats.failed,
                "invocations": stats.invocations,
            }),
        )
        .await;

        rejected.map_or(Ok(()), Err)
    }

    async fn run_passes(&mut self, stats: &mut BatchStats) -> Result<(), DeployflowError> {
        loop {
            if stats.passes >= self.config.max_passes {
                warn!(max_passes = self.config.max_passes, "Batch pass limit reached");
                return Ok(());
            }
            stats.passes += 1;
            if self.retreat_pass(stats).await? {
                continue;
            }
            if !self.advance_pass(stats).await? {
                return Ok(());
            }
        }
    }

    /// Performs every pending retreat, latest registration first.
    async fn retreat_pass(&mut self, stats: &mut BatchStats) -> Result<bool, DeployflowError> {
        let roots: Vec<UnitId> = self.tracker.roots().iter().rev().copied().collect();
        let mut progressed = false;
        for root in roots {
            while let Some(stage) = self.retreat_pending(root) {
                self.retreat_step(root, &mut HashSet::new(), stats).await?;
                progressed = true;
                if self.stage_of(root).as_ref() == Some(&stage) {
                    break;
                }
            }
        }
        Ok(progressed)
    }

    fn retreat_pending(&self, root: UnitId) -> Option<Stage> {
        self.tracker
            .context(root)
            .filter(|c| c.stage() > c.requested())
            .map(|c| c.stage().clone())
    }

    fn stage_of(&self, root: UnitId) -> Option<Stage> {
        self.tracker.context(root).map(|c| c.stage().clone())
    }

    /// Moves `root` down one stage, first pulling back every deployment
    /// that needs `root` at its current stage.
    fn retreat_step<'a>(
        &'a mut self,
        root: UnitId,
        active: &'a mut HashSet<UnitId>,
        stats: &'a mut BatchStats,
    ) -> BoxFuture<'a, Result<(), DeployflowError>> {
        async move {
            let Some(context) = self.tracker.context(root) else {
                return Ok(());
            };
            let name = context.name().to_string();
            let leaving = context.stage().clone();
            let Some(below) = self.stages.predecessor(&leaving).cloned() else {
                return Ok(());
            };

            active.insert(root);
            for (dependent, target) in self.tracker.dependents_to_retreat(&self.units, root, &below) {
                if active.contains(&dependent) {
                    continue;
                }
                while let Some(stage) = self.stage_of(dependent) {
                    if stage <= target {
                        break;
                    }
                    debug!(deployment = %name, dependent = %dependent, to = %target, "Pulling back dependent");
                    self.retreat_step(dependent, active, stats).await?;
                    if self.stage_of(dependent).as_ref() == Some(&stage) {
                        break;
                    }
                }
            }

            let undone = self
                .processor
                .undeploy_step(&mut self.units, root, &leaving)
                .await;
            self.tracker.mark_retreated(root, &below)?;
            active.remove(&root);

            stats.retreated += 1;
            stats.invocations += undone;
            debug!(deployment = %name, from = %leaving, to = %below, undeployed = undone, "Retreated");
            self.emit(
                events::STAGE_LEFT,
                json!({"deployment": name, "stage": leaving.name(), "now": below.name()}),
            )
            .await;
            Ok(())
        }
        .boxed()
    }

    /// Gives every deployment one forward step, in registration order.
    async fn advance_pass(&mut self, stats: &mut BatchStats) -> Result<bool, DeployflowError> {
        let roots = self.tracker.roots().to_vec();
        let mut progressed = false;
        for root in roots {
            match self.tracker.check_advance(&self.units, root) {
                Advance::Idle => {}
                Advance::Blocked(missing) => self.park(root, missing).await,
                Advance::Ready(next) => {
                    progressed = true;
                    self.advance_step(root, next, stats).await?;
                }
            }
        }
        Ok(progressed)
    }

    async fn park(&mut self, root: UnitId, missing: Vec<MissingDependency>) {
        let waiting: Vec<String> = missing.iter().map(ToString::to_string).collect();
        if !self.tracker.set_waiting(root, missing) {
            return;
        }
        let Some(context) = self.tracker.context(root) else {
            return;
        };
        let name = context.name().to_string();
        let stage = context.stage().name().to_string();
        debug!(deployment = %name, stage = %stage, waiting = ?waiting, "Parked on dependencies");
        self.emit(
            events::UNIT_PARKED,
            json!({"deployment": name, "stage": stage, "waiting_on": waiting}),
        )
        .await;
    }

    async fn advance_step(
        &mut self,
        root: UnitId,
        next: Stage,
        stats: &mut BatchStats,
    ) -> Result<(), DeployflowError> {
        let name = self
            .tracker
            .context(root)
            .map(|c| c.name().to_string())
            .unwrap_or_default();

        match self
            .processor
            .deploy_step(&mut self.units, root, &next)
            .await
        {
            Ok(applied) => {
                self.tracker.mark_advanced(root, &next)?;
                stats.advanced += 1;
                stats.invocations += applied;
                debug!(deployment = %name, stage = %next, deployed = applied, "Advanced");
                self.emit(
                    events::STAGE_ENTERED,
                    json!({"deployment": name, "stage": next.name()}),
                )
                .await;
            }
            Err(err) => {
                error!(
                    deployment = %name,
                    unit = %err.unit,
                    stage = %next,
                    error = %err.cause,
                    "Deployment failed"
                );
                stats.failed += 1;
                self.emit(
                    events::UNIT_FAILED,
                    json!({
                        "deployment": name,
                        "unit": err.unit,
                        "stage": next.name(),
                        "error": err.cause.to_string(),
                    }),
                )
                .await;
                self.tracker.mark_error(root, err);
            }
        }
        Ok(())
    }

    async fn sweep_removed(&mut self) {
        let done: Vec<UnitId> = self
            .tracker
            .contexts()
            .filter(|c| c.is_removing() && c.stage().is_floor())
            .map(DeploymentContext::root)
            .collect();
        for root in done {
            let Some(context) = self.tracker.unregister(root) else {
                continue;
            };
            let removed = self.units.remove_tree(root);
            info!(deployment = %context.name(), units = removed.len(), "Deployment removed");
            self.emit(
                events::DEPLOYMENT_REMOVED,
                json!({"deployment": context.name(), "units": removed}),
            )
            .await;
        }
    }

    async fn materialize_pending(&mut self) -> Option<DeployflowError> {
        let mut rejected = None;
        for deployment in std::mem::take(&mut self.pending) {
            let name = deployment.name().to_string();
            match self.units.insert_tree(deployment) {
                Ok(root) => {
                    let units = self.units.tree(root).len();
                    self.tracker
                        .register(root, name.clone(), self.default_target.clone());
                    info!(deployment = %name, units, target = %self.default_target, "Deployment added");
                    self.emit(
                        events::DEPLOYMENT_ADDED,
                        json!({"deployment": name, "units": units}),
                    )
                    .await;
                }
                Err(err) => {
                    error!(deployment = %name, error = %err, "Deployment rejected");
                    rejected.get_or_insert(err);
                }
            }
        }
        rejected
    }

    async fn emit(&self, event_type: &str, mut data: serde_json::Value) {
        if !self.config.emit_events {
            return;
        }
        if let Some(map) = data.as_object_mut() {
            map.insert("timestamp".to_string(), json!(iso_timestamp()));
        }
        self.events.emit(event_type, Some(data)).await;
    }

    // ------------------------------------------------------------------
    // Client operations
    // ------------------------------------------------------------------

    /// Adds a deployment and drives it to the default target.
    ///
    /// # Errors
    ///
    /// Returns queueing errors, and `Incomplete` if the deployment falls
    /// short while `error_on_incomplete` is configured.
    pub async fn deploy(&mut self, deployment: Deployment) -> Result<(), DeployflowError> {
        let name = deployment.name().to_string();
        self.add_deployment(deployment)?;
        self.process().await?;
        if self.config.error_on_incomplete {
            self.check_complete_for(&[name.as_str()])?;
        }
        Ok(())
    }

    /// Adds several deployments and drives them in one batch.
    ///
    /// # Errors
    ///
    /// As [`DeploymentController::deploy`], for all of them together.
    pub async fn deploy_all(&mut self, deployments: Vec<Deployment>) -> Result<(), DeployflowError> {
        let names: Vec<String> = deployments.iter().map(|d| d.name().to_string()).collect();
        for deployment in deployments {
            self.add_deployment(deployment)?;
        }
        self.process().await?;
        if self.config.error_on_incomplete {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            self.check_complete_for(&names)?;
        }
        Ok(())
    }

    /// Removes a deployment after walking it back to the floor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDeployment` if no deployment has this name.
    pub async fn undeploy(&mut self, name: &str) -> Result<(), DeployflowError> {
        if !self.remove_deployment(name)? {
            return Err(DeployflowError::UnknownDeployment(name.to_string()));
        }
        self.process().await?;
        if self.config.error_on_incomplete && self.units.find(name).is_some() {
            self.check_complete_for(&[name])?;
        }
        Ok(())
    }

    /// Moves the named deployments to `stage`.
    ///
    /// Names may refer to nested units; the whole deployment they belong to
    /// moves. A deployment in error gets a fresh attempt. Deployments
    /// already at `stage` are untouched.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStage`/`UnknownDeployment` for bad arguments, and
    /// `Incomplete` if `error_on_incomplete` is set and any named
    /// deployment falls short.
    pub async fn change(
        &mut self,
        stage: &Stage,
        error_on_incomplete: bool,
        names: &[&str],
    ) -> Result<(), DeployflowError> {
        let target = self.stages.resolve(stage)?;
        let roots = self.resolve_roots(names)?;
        info!(stage = %target, deployments = roots.len(), "Changing deployments");
        for root in &roots {
            self.tracker.request(*root, target.clone());
        }
        self.process().await?;
        if error_on_incomplete {
            self.check_roots(&roots)?;
        }
        Ok(())
    }

    /// Takes the named deployments down to at most `stage` and back up to
    /// the stage each had reached.
    ///
    /// Deployments at or below `stage` are untouched. A deployment parked
    /// or in error below its requested stage comes back to where it was,
    /// keeps its requested stage, and keeps its recorded error unless the
    /// re-advance failed anew.
    ///
    /// # Errors
    ///
    /// As [`DeploymentController::change`].
    pub async fn bounce(
        &mut self,
        stage: &Stage,
        error_on_incomplete: bool,
        names: &[&str],
    ) -> Result<(), DeployflowError> {
        let target = self.stages.resolve(stage)?;
        let roots = self.resolve_roots(names)?;

        let bounced: Vec<Bounced> = roots
            .iter()
            .filter_map(|root| self.tracker.context(*root))
            .filter(|c| !c.is_removing() && *c.stage() > target)
            .map(|c| Bounced {
                root: c.root(),
                reached: c.stage().clone(),
                requested: c.requested().clone(),
                error: c.error().cloned(),
            })
            .collect();
        info!(stage = %target, deployments = bounced.len(), "Bouncing deployments");

        for b in &bounced {
            self.tracker.request(b.root, target.clone());
        }
        self.process().await?;

        for b in &bounced {
            self.tracker.restore_request(b.root, b.reached.clone());
        }
        self.process().await?;

        for b in bounced {
            self.tracker.restore_request(b.root, b.requested);
            let Some(error) = b.error else {
                continue;
            };
            let back = self
                .tracker
                .context(b.root)
                .is_some_and(|c| c.error().is_none() && *c.stage() == b.reached);
            if back {
                self.tracker.mark_error(b.root, error);
            }
        }
        self.process().await?;

        if error_on_incomplete {
            self.check_roots(&roots)?;
        }
        Ok(())
    }

    fn resolve_roots(&self, names: &[&str]) -> Result<Vec<UnitId>, DeployflowError> {
        let mut roots = Vec::new();
        for name in names {
            let unit = self
                .units
                .by_name(name)
                .ok_or_else(|| DeployflowError::UnknownDeployment((*name).to_string()))?;
            if !roots.contains(&unit.top()) {
                roots.push(unit.top());
            }
        }
        Ok(roots)
    }

    // ------------------------------------------------------------------
    // Completeness
    // ------------------------------------------------------------------

    /// Builds the report for every tracked deployment.
    #[must_use]
    pub fn incomplete_report(&self) -> IncompleteDeploymentReport {
        IncompleteDeploymentReport::from_contexts(self.tracker.contexts())
    }

    /// Fails if any tracked deployment is short of its requested stage.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` carrying the report.
    pub fn check_complete(&self) -> Result<(), DeployflowError> {
        Self::report_result(self.incomplete_report())
    }

    /// Fails if any of the named deployments is short of its requested
    /// stage.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDeployment` for unknown names and `Incomplete`
    /// carrying the report.
    pub fn check_complete_for(&self, names: &[&str]) -> Result<(), DeployflowError> {
        let roots = self.resolve_roots(names)?;
        self.check_roots(&roots)
    }

    fn check_roots(&self, roots: &[UnitId]) -> Result<(), DeployflowError> {
        let report = IncompleteDeploymentReport::from_contexts(
            roots.iter().filter_map(|root| self.tracker.context(*root)),
        );
        Self::report_result(report)
    }

    fn report_result(report: IncompleteDeploymentReport) -> Result<(), DeployflowError> {
        if report.is_empty() {
            Ok(())
        } else {
            Err(IncompleteDeploymentError::new(report).into())
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn context_of(&self, name: &str) -> Option<&DeploymentContext> {
        self.units
            .by_name(name)
            .and_then(|unit| self.tracker.context(unit.top()))
    }

    /// Returns a unit by name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&DeploymentUnit> {
        self.units.by_name(name)
    }

    /// Returns the stage a unit's deployment has reached.
    #[must_use]
    pub fn unit_stage(&self, name: &str) -> Option<Stage> {
        self.context_of(name).map(|c| c.stage().clone())
    }

    /// Returns the tracked state of a unit's deployment.
    #[must_use]
    pub fn unit_state(&self, name: &str) -> Option<UnitState> {
        self.context_of(name).map(DeploymentContext::state)
    }

    /// Returns the stage a unit's deployment has been asked to reach.
    #[must_use]
    pub fn requested_stage(&self, name: &str) -> Option<Stage> {
        self.context_of(name).map(|c| c.requested().clone())
    }

    /// Returns the tracking context of a unit's deployment.
    #[must_use]
    pub fn deployment(&self, name: &str) -> Option<&DeploymentContext> {
        self.context_of(name)
    }

    /// Returns the dependencies holding a unit's deployment back.
    #[must_use]
    pub fn waiting_on(&self, name: &str) -> Vec<MissingDependency> {
        self.context_of(name)
            .map(|c| c.waiting_on().to_vec())
            .unwrap_or_default()
    }

    /// Returns tracked deployment names in registration order.
    #[must_use]
    pub fn deployment_names(&self) -> Vec<String> {
        self.tracker
            .contexts()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Returns queued deployment names.
    #[must_use]
    pub fn pending_names(&self) -> Vec<String> {
        self.pending.iter().map(|d| d.name().to_string()).collect()
    }
}

impl fmt::Debug for DeploymentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentController")
            .field("config", &self.config)
            .field("default_target", &self.default_target)
            .field("deployments", &self.deployment_names())
            .field("pending", &self.pending_names())
            .finish_non_exhaustive()
    }
}
