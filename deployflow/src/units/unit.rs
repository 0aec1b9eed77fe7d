//! The deployment unit handed to deployers.

use super::{Attachments, UnitId};
use crate::dependency::{DependencyInfo, DependencyItem};
use crate::deployers::Deployer;
use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Where a unit sits in its deployment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// The root of a deployment.
    TopLevel,
    /// A nested deployment (e.g. an archive inside an archive).
    Child,
    /// A component of a unit (e.g. a bean described by the unit).
    Component,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLevel => write!(f, "top_level"),
            Self::Child => write!(f, "child"),
            Self::Component => write!(f, "component"),
        }
    }
}

/// One artifact or sub-component moving through the stages.
///
/// Units are owned by the controller's arena. Tree links are [`UnitId`]
/// handles; a unit never owns its parent.
#[derive(Debug)]
pub struct DeploymentUnit {
    id: UnitId,
    name: String,
    kind: UnitKind,
    parent: Option<UnitId>,
    top: UnitId,
    pub(super) children: Vec<UnitId>,
    pub(super) components: Vec<UnitId>,
    attachments: Attachments,
    dependencies: DependencyInfo,
    stepping: Option<Stage>,
    applied: BTreeMap<Stage, Vec<Arc<dyn Deployer>>>,
}

impl DeploymentUnit {
    pub(super) fn new(
        id: UnitId,
        name: String,
        kind: UnitKind,
        parent: Option<UnitId>,
        top: UnitId,
        attachments: Attachments,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            parent,
            top,
            children: Vec::new(),
            components: Vec::new(),
            attachments,
            dependencies: DependencyInfo::new(),
            stepping: None,
            applied: BTreeMap::new(),
        }
    }

    /// Returns the unit's handle.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Returns the unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit kind.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Returns true for the root of a deployment.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        matches!(self.kind, UnitKind::TopLevel)
    }

    /// Returns true for component units.
    #[must_use]
    pub const fn is_component(&self) -> bool {
        matches!(self.kind, UnitKind::Component)
    }

    /// Returns the parent handle, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<UnitId> {
        self.parent
    }

    /// Returns the handle of the top-level unit of this tree.
    #[must_use]
    pub const fn top(&self) -> UnitId {
        self.top
    }

    /// Returns the child deployment handles.
    #[must_use]
    pub fn children(&self) -> &[UnitId] {
        &self.children
    }

    /// Returns the component handles.
    #[must_use]
    pub fn components(&self) -> &[UnitId] {
        &self.components
    }

    /// Returns the attachments.
    #[must_use]
    pub const fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Returns the attachments for writing.
    pub fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    /// Returns the dependency items this unit has declared.
    #[must_use]
    pub const fn dependencies(&self) -> &DependencyInfo {
        &self.dependencies
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut DependencyInfo {
        &mut self.dependencies
    }

    /// Declares that this unit may not enter `when_required` until
    /// `depends_on` has reached `required_state`.
    ///
    /// Items declared while a deployer runs are dropped again when that
    /// stage is undone.
    pub fn add_dependency(
        &mut self,
        depends_on: impl Into<String>,
        when_required: Stage,
        required_state: Stage,
    ) {
        let mut item =
            DependencyItem::new(self.name.clone(), depends_on, when_required, required_state);
        item.declared_at = self.stepping.clone();
        self.dependencies.add(item);
    }

    /// Returns the stage currently being stepped into or out of, if a
    /// deployer is running against this unit.
    #[must_use]
    pub const fn stepping(&self) -> Option<&Stage> {
        self.stepping.as_ref()
    }

    pub(crate) fn set_stepping(&mut self, stage: Option<Stage>) {
        self.stepping = stage;
    }

    /// Returns the names of the deployers applied when this unit entered
    /// `stage`, in the order they ran.
    #[must_use]
    pub fn applied_at(&self, stage: &Stage) -> Vec<&str> {
        self.applied
            .get(stage)
            .map(|ds| ds.iter().map(|d| d.name()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn record_applied(&mut self, stage: &Stage, deployer: Arc<dyn Deployer>) {
        self.applied.entry(stage.clone()).or_default().push(deployer);
    }

    pub(crate) fn take_applied(&mut self, stage: &Stage) -> Vec<Arc<dyn Deployer>> {
        self.applied.remove(stage).unwrap_or_default()
    }

    pub(crate) fn drop_dependencies_declared_at(&mut self, stage: &Stage) -> usize {
        self.dependencies.remove_declared_at(stage)
    }
}
