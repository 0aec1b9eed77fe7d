//! Input description of a deployment tree.

use super::{AttachmentKey, Attachments};
use crate::dependency::DependencyItem;
use crate::stages::Stage;
use std::any::Any;

/// A deployment handed to the controller: a named unit with optional
/// children, components, initial attachments and static dependencies.
///
/// The controller flattens the tree into its arena when the deployment is
/// processed.
#[derive(Debug)]
pub struct Deployment {
    pub(crate) name: String,
    pub(crate) attachments: Attachments,
    pub(crate) children: Vec<Deployment>,
    pub(crate) components: Vec<Deployment>,
    pub(crate) dependencies: Vec<DependencyItem>,
}

impl Deployment {
    /// Creates a new deployment with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Attachments::new(),
            children: Vec::new(),
            components: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Returns the deployment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a value under its type key.
    #[must_use]
    pub fn with_attachment<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.attachments.put(value);
        self
    }

    /// Attaches a value under an explicit key.
    #[must_use]
    pub fn with_named_attachment<T: Any + Send + Sync>(
        mut self,
        key: impl Into<AttachmentKey>,
        value: T,
    ) -> Self {
        self.attachments.put_named(key, value);
        self
    }

    /// Adds a nested deployment.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Adds a component.
    #[must_use]
    pub fn with_component(mut self, component: Self) -> Self {
        self.components.push(component);
        self
    }

    /// Declares a dependency that holds for the lifetime of the deployment.
    #[must_use]
    pub fn depends_on(
        mut self,
        target: impl Into<String>,
        when_required: Stage,
        required_state: Stage,
    ) -> Self {
        let item = DependencyItem::new(self.name.clone(), target, when_required, required_state);
        self.dependencies.push(item);
        self
    }

    /// Returns every name in the tree, this deployment first.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for component in &self.components {
            names.extend(component.names());
        }
        for child in &self.children {
            names.extend(child.names());
        }
        names
    }

    /// Returns every static dependency declared in the tree, in the same
    /// order as [`Deployment::names`].
    #[must_use]
    pub fn dependency_items(&self) -> Vec<&DependencyItem> {
        let mut items: Vec<&DependencyItem> = self.dependencies.iter().collect();
        for component in &self.components {
            items.extend(component.dependency_items());
        }
        for child in &self.children {
            items.extend(child.dependency_items());
        }
        items
    }
}
