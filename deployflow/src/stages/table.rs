//! The immutable stage table.

use super::Stage;
use crate::errors::{StageTableError, UnknownStageError};
use std::collections::HashSet;

/// The fixed, totally ordered chain of stages, floor first.
///
/// Built once through [`StageTableBuilder`] and shared as
/// `Arc<StageTable>`. A built table never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTable {
    stages: Vec<Stage>,
}

impl StageTable {
    /// Returns the standard chain from `NotInstalled` to `Installed`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: Stage::STANDARD.to_vec(),
        }
    }

    /// Starts a builder seeded with only the floor stage.
    #[must_use]
    pub fn builder() -> StageTableBuilder {
        StageTableBuilder {
            names: vec![Stage::NOT_INSTALLED.name().to_string()],
        }
    }

    /// Starts a builder seeded with the standard chain.
    #[must_use]
    pub fn standard_builder() -> StageTableBuilder {
        StageTableBuilder {
            names: Stage::STANDARD.iter().map(|s| s.name().to_string()).collect(),
        }
    }

    /// Returns all stages, floor first.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the number of stages including the floor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; a table holds at least the floor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the floor stage.
    #[must_use]
    pub fn floor(&self) -> &Stage {
        &self.stages[0]
    }

    /// Returns the highest stage.
    #[must_use]
    pub fn last(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    /// Looks a stage up by name, walking the chain from the floor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStageError` if no stage has this name.
    pub fn lookup(&self, name: &str) -> Result<Stage, UnknownStageError> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| UnknownStageError::new(name))
    }

    /// Resolves a stage value by name against this table.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStageError` if the name is not part of this table.
    pub fn resolve(&self, stage: &Stage) -> Result<Stage, UnknownStageError> {
        match self.stages.get(stage.index()) {
            Some(s) if s == stage => Ok(s.clone()),
            _ => self.lookup(stage.name()),
        }
    }

    /// Returns true if this exact stage belongs to the table.
    #[must_use]
    pub fn contains(&self, stage: &Stage) -> bool {
        self.stages.get(stage.index()) == Some(stage)
    }

    /// Returns the stage immediately after `stage`.
    #[must_use]
    pub fn successor(&self, stage: &Stage) -> Option<&Stage> {
        self.stages.get(stage.index() + 1)
    }

    /// Returns the stage immediately before `stage`.
    #[must_use]
    pub fn predecessor(&self, stage: &Stage) -> Option<&Stage> {
        stage.index().checked_sub(1).and_then(|i| self.stages.get(i))
    }

    /// Returns the single steps needed to move from `from` to `to`.
    ///
    /// Forward moves list every stage after `from` up to and including
    /// `to`. Backward moves list every stage being left, from `from` down to
    /// the stage just above `to`.
    #[must_use]
    pub fn steps(&self, from: &Stage, to: &Stage) -> Vec<Stage> {
        let (a, b) = (from.index(), to.index());
        if a < b {
            self.stages[a + 1..=b].to_vec()
        } else {
            self.stages[b + 1..=a].iter().rev().cloned().collect()
        }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builder for custom stage tables.
#[derive(Debug, Clone)]
pub struct StageTableBuilder {
    names: Vec<String>,
}

impl StageTableBuilder {
    /// Appends a stage at the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already present.
    pub fn stage(mut self, name: impl Into<String>) -> Result<Self, StageTableError> {
        let name = self.check_new(name.into())?;
        self.names.push(name);
        Ok(self)
    }

    /// Inserts a stage directly after `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, already present, or `after`
    /// is not in the chain.
    pub fn stage_after(
        mut self,
        name: impl Into<String>,
        after: &str,
    ) -> Result<Self, StageTableError> {
        let name = self.check_new(name.into())?;
        let pos = self.position(&name, after)?;
        self.names.insert(pos + 1, name);
        Ok(self)
    }

    /// Inserts a stage directly before `before`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, already present, `before` is
    /// not in the chain, or `before` is the floor.
    pub fn stage_before(
        mut self,
        name: impl Into<String>,
        before: &str,
    ) -> Result<Self, StageTableError> {
        let name = self.check_new(name.into())?;
        let pos = self.position(&name, before)?;
        if pos == 0 {
            return Err(StageTableError::BeforeFloor(name));
        }
        self.names.insert(pos, name);
        Ok(self)
    }

    /// Builds the table, assigning each stage its final index.
    #[must_use]
    pub fn build(self) -> StageTable {
        let stages = self
            .names
            .into_iter()
            .enumerate()
            .map(|(index, name)| match Stage::STANDARD.get(index) {
                Some(builtin) if builtin.name() == name => builtin.clone(),
                _ => Stage::new(name, index),
            })
            .collect();
        StageTable { stages }
    }

    fn check_new(&self, name: String) -> Result<String, StageTableError> {
        if name.trim().is_empty() {
            return Err(StageTableError::EmptyName);
        }
        let existing: HashSet<&str> = self.names.iter().map(String::as_str).collect();
        if existing.contains(name.as_str()) {
            return Err(StageTableError::Duplicate(name));
        }
        Ok(name)
    }

    fn position(&self, name: &str, anchor: &str) -> Result<usize, StageTableError> {
        self.names
            .iter()
            .position(|n| n == anchor)
            .ok_or_else(|| StageTableError::UnknownAnchor {
                stage: name.to_string(),
                anchor: anchor.to_string(),
            })
    }
}
