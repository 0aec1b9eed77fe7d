//! Arena owning every deployment unit known to a controller.

use super::{Deployment, DeploymentUnit, UnitKind};
use crate::errors::DeployflowError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle to a unit in a [`UnitArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub(crate) usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns units and resolves names to handles.
///
/// Slots of removed trees go on a free list and are handed out again, so a
/// handle is only meaningful while its tree is live.
#[derive(Debug, Default)]
pub struct UnitArena {
    slots: Vec<Option<DeploymentUnit>>,
    free: Vec<usize>,
    by_name: HashMap<String, UnitId>,
}

impl UnitArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens a deployment tree into the arena and returns the root handle.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeployment` for empty names and `DuplicateDeployment`
    /// when any name in the tree is already taken. Nothing is inserted on
    /// error.
    pub fn insert_tree(&mut self, deployment: Deployment) -> Result<UnitId, DeployflowError> {
        let mut seen = HashSet::new();
        for name in deployment.names() {
            if name.trim().is_empty() {
                return Err(DeployflowError::InvalidDeployment(
                    "unit name cannot be empty".to_string(),
                ));
            }
            if self.by_name.contains_key(name) || !seen.insert(name) {
                return Err(DeployflowError::DuplicateDeployment(name.to_string()));
            }
        }

        Ok(self.insert_node(deployment, UnitKind::TopLevel, None, None))
    }

    fn allocate(&mut self) -> UnitId {
        if let Some(index) = self.free.pop() {
            return UnitId(index);
        }
        self.slots.push(None);
        UnitId(self.slots.len() - 1)
    }

    fn insert_node(
        &mut self,
        deployment: Deployment,
        kind: UnitKind,
        parent: Option<UnitId>,
        top: Option<UnitId>,
    ) -> UnitId {
        let id = self.allocate();
        let top = top.unwrap_or(id);
        let Deployment {
            name,
            attachments,
            children,
            components,
            dependencies,
        } = deployment;

        let mut unit = DeploymentUnit::new(id, name.clone(), kind, parent, top, attachments);
        for item in dependencies {
            unit.dependencies_mut().add(item);
        }
        self.slots[id.0] = Some(unit);
        self.by_name.insert(name, id);

        for component in components {
            let cid = self.insert_node(component, UnitKind::Component, Some(id), Some(top));
            if let Some(unit) = self.get_mut(id) {
                unit.components.push(cid);
            }
        }
        for child in children {
            let cid = self.insert_node(child, UnitKind::Child, Some(id), Some(top));
            if let Some(unit) = self.get_mut(id) {
                unit.children.push(cid);
            }
        }
        id
    }

    /// Removes the whole tree rooted at `root` and returns the removed names.
    pub fn remove_tree(&mut self, root: UnitId) -> Vec<String> {
        let mut removed = Vec::new();
        for id in self.tree(root) {
            if let Some(unit) = self.slots.get_mut(id.0).and_then(Option::take) {
                self.free.push(id.0);
                self.by_name.remove(unit.name());
                removed.push(unit.name().to_string());
            }
        }
        removed
    }

    /// Returns a unit by handle.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&DeploymentUnit> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Returns a unit by handle for writing.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut DeploymentUnit> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Resolves a unit name to its handle.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    /// Returns a unit by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&DeploymentUnit> {
        self.find(name).and_then(|id| self.get(id))
    }

    /// Returns the handles of a tree in processing order: each unit, then
    /// its components, then its children.
    #[must_use]
    pub fn tree(&self, root: UnitId) -> Vec<UnitId> {
        let mut order = Vec::new();
        self.walk(root, &mut order);
        order
    }

    fn walk(&self, id: UnitId, order: &mut Vec<UnitId>) {
        let Some(unit) = self.get(id) else {
            return;
        };
        order.push(id);
        for &component in unit.components() {
            self.walk(component, order);
        }
        for &child in unit.children() {
            self.walk(child, order);
        }
    }

    /// Returns the number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if no units are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(arena: &UnitArena, ids: &[UnitId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| arena.get(*id))
            .map(|u| u.name().to_string())
            .collect()
    }

    #[test]
    fn test_insert_tree_links_parents() {
        let mut arena = UnitArena::new();
        let root = arena
            .insert_tree(
                Deployment::new("app.ear")
                    .with_child(Deployment::new("web.war"))
                    .with_component(Deployment::new("app.bean")),
            )
            .unwrap();

        assert_eq!(arena.len(), 3);
        let web = arena.by_name("web.war").unwrap();
        assert_eq!(web.parent(), Some(root));
        assert_eq!(web.top(), root);
        assert_eq!(web.kind(), UnitKind::Child);
        assert_eq!(arena.by_name("app.bean").unwrap().kind(), UnitKind::Component);
        assert_eq!(
            names(&arena, &arena.tree(root)),
            vec!["app.ear", "app.bean", "web.war"]
        );
    }

    #[test]
    fn test_duplicate_names_rejected_atomically() {
        let mut arena = UnitArena::new();
        arena.insert_tree(Deployment::new("a")).unwrap();

        let err = arena
            .insert_tree(Deployment::new("b").with_child(Deployment::new("a")))
            .unwrap_err();
        assert!(matches!(err, DeployflowError::DuplicateDeployment(n) if n == "a"));
        assert!(arena.find("b").is_none());

        let err = arena
            .insert_tree(Deployment::new("c").with_child(Deployment::new("c")))
            .unwrap_err();
        assert!(matches!(err, DeployflowError::DuplicateDeployment(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut arena = UnitArena::new();
        let err = arena.insert_tree(Deployment::new(" ")).unwrap_err();
        assert!(matches!(err, DeployflowError::InvalidDeployment(_)));
    }

    #[test]
    fn test_remove_tree() {
        let mut arena = UnitArena::new();
        let root = arena
            .insert_tree(Deployment::new("a").with_child(Deployment::new("a.child")))
            .unwrap();
        let other = arena.insert_tree(Deployment::new("b")).unwrap();

        let removed = arena.remove_tree(root);
        assert_eq!(removed, vec!["a".to_string(), "a.child".to_string()]);
        assert!(arena.find("a.child").is_none());
        assert!(arena.get(other).is_some());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut arena = UnitArena::new();
        for _ in 0..3 {
            let root = arena
                .insert_tree(Deployment::new("app").with_child(Deployment::new("lib")))
                .unwrap();
            assert_eq!(arena.by_name("lib").unwrap().top(), root);
            arena.remove_tree(root);
        }

        assert_eq!(arena.slots.len(), 2);
        assert!(arena.is_empty());
    }
}
