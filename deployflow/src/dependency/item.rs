//! Dependency items declared by units.

use crate::stages::Stage;
use serde::Serialize;
use std::fmt;

/// "Unit `dependent` may not enter `when_required` until unit `depends_on`
/// has reached `required_state`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyItem {
    /// The unit that is held back.
    pub dependent: String,
    /// The unit being waited on.
    pub depends_on: String,
    /// The stage the dependent cannot enter until resolved.
    pub when_required: Stage,
    /// The stage the target must have reached.
    pub required_state: Stage,
    /// The stage whose step declared this item; `None` for items declared
    /// with the deployment itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<Stage>,
}

impl DependencyItem {
    /// Creates a new dependency item.
    #[must_use]
    pub fn new(
        dependent: impl Into<String>,
        depends_on: impl Into<String>,
        when_required: Stage,
        required_state: Stage,
    ) -> Self {
        Self {
            dependent: dependent.into(),
            depends_on: depends_on.into(),
            when_required,
            required_state,
            declared_at: None,
        }
    }
}

impl fmt::Display for DependencyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} needs {} at {} before {}",
            self.dependent, self.depends_on, self.required_state, self.when_required
        )
    }
}

/// The dependency items a unit has declared.
#[derive(Debug, Clone, Default)]
pub struct DependencyInfo {
    items: Vec<DependencyItem>,
}

impl DependencyInfo {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item. Exact duplicates are ignored.
    pub fn add(&mut self, item: DependencyItem) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    /// Returns all items.
    #[must_use]
    pub fn items(&self) -> &[DependencyItem] {
        &self.items
    }

    /// Drops every item declared by the step into `stage`.
    pub fn remove_declared_at(&mut self, stage: &Stage) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| item.declared_at.as_ref() != Some(stage));
        before - self.items.len()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A dependency that was still unresolved when it was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDependency {
    /// The unit that is held back.
    pub dependent: String,
    /// The unit being waited on.
    pub depends_on: String,
    /// The stage the dependent cannot enter.
    pub when_required: Stage,
    /// The stage the target must reach.
    pub required_state: Stage,
    /// The target's current stage, `None` if it is not deployed.
    pub actual_state: Option<Stage>,
    /// True if the target is in error.
    pub target_in_error: bool,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match (&self.actual_state, self.target_in_error) {
            (None, _) => "** NOT FOUND **".to_string(),
            (Some(_), true) => "** ERROR **".to_string(),
            (Some(stage), false) => stage.to_string(),
        };
        write!(
            f,
            "{} {{Required: {}, Actual: {}}}",
            self.depends_on, self.required_state, actual
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ignores_duplicates() {
        let mut info = DependencyInfo::new();
        let item = DependencyItem::new("web", "db", Stage::REAL, Stage::INSTALLED);
        info.add(item.clone());
        info.add(item);
        assert_eq!(info.len(), 1);
    }

    #[test]
    fn test_remove_declared_at() {
        let mut info = DependencyInfo::new();
        info.add(DependencyItem::new("a", "b", Stage::REAL, Stage::REAL));
        info.add(DependencyItem {
            declared_at: Some(Stage::DESCRIBE),
            ..DependencyItem::new("a", "c", Stage::REAL, Stage::REAL)
        });

        assert_eq!(info.remove_declared_at(&Stage::DESCRIBE), 1);
        assert_eq!(info.items()[0].depends_on, "b");
        assert_eq!(info.remove_declared_at(&Stage::DESCRIBE), 0);
    }

    #[test]
    fn test_missing_dependency_display() {
        let missing = MissingDependency {
            dependent: "web".to_string(),
            depends_on: "db".to_string(),
            when_required: Stage::REAL,
            required_state: Stage::INSTALLED,
            actual_state: None,
            target_in_error: false,
        };
        assert_eq!(
            missing.to_string(),
            "db {Required: Installed, Actual: ** NOT FOUND **}"
        );

        let errored = MissingDependency {
            actual_state: Some(Stage::PARSE),
            target_in_error: true,
            ..missing
        };
        assert!(errored.to_string().ends_with("Actual: ** ERROR **}"));
    }
}
