//! Deployer registry.

use super::Deployer;
use crate::errors::RegistryError;
use crate::stages::{Stage, StageTable};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Registration {
    deployer: Arc<dyn Deployer>,
    stage: Stage,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Registration>,
    next_seq: u64,
}

/// Registry of live deployers, keyed by name and grouped by stage.
///
/// Shared as `Arc<DeployerRegistry>`; deployers may be added or removed
/// from any thread while a batch runs. Readers get snapshots.
#[derive(Debug)]
pub struct DeployerRegistry {
    stages: Arc<StageTable>,
    inner: RwLock<Inner>,
}

impl DeployerRegistry {
    /// Creates an empty registry over the standard stage table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_stages(Arc::new(StageTable::standard()))
    }

    /// Creates an empty registry over a custom stage table.
    #[must_use]
    pub fn with_stages(stages: Arc<StageTable>) -> Self {
        Self {
            stages,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Returns the stage table deployers are validated against.
    #[must_use]
    pub fn stage_table(&self) -> &Arc<StageTable> {
        &self.stages
    }

    /// Registers a deployer.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or taken, the stage is unknown
    /// or the floor, or an attachment key is empty.
    pub fn add_deployer(&self, deployer: Arc<dyn Deployer>) -> Result<(), RegistryError> {
        let name = deployer.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let stage = self
            .stages
            .resolve(deployer.stage())
            .map_err(|e| RegistryError::UnknownStage {
                deployer: name.clone(),
                stage: e.name,
            })?;
        if stage.is_floor() {
            return Err(RegistryError::FloorStage {
                deployer: name,
                stage: stage.to_string(),
            });
        }

        let empty_key = deployer
            .inputs()
            .iter()
            .chain(deployer.outputs())
            .chain(deployer.required_input())
            .any(|key| key.as_str().trim().is_empty());
        if empty_key {
            return Err(RegistryError::EmptyAttachmentKey(name));
        }

        let mut inner = self.inner.write();
        if inner.entries.iter().any(|r| r.deployer.name() == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        debug!(deployer = %name, stage = %stage, "Registered deployer");
        inner.entries.push(Registration {
            deployer,
            stage,
            seq,
        });
        Ok(())
    }

    /// Unregisters a deployer by name and returns it.
    ///
    /// Units already processed by the deployer are left alone; they are
    /// undeployed by the instance recorded when they were deployed.
    pub fn remove_deployer(&self, name: &str) -> Option<Arc<dyn Deployer>> {
        let mut inner = self.inner.write();
        let pos = inner.entries.iter().position(|r| r.deployer.name() == name)?;
        debug!(deployer = %name, "Removed deployer");
        Some(inner.entries.remove(pos).deployer)
    }

    /// Returns a snapshot of the deployers for a stage, ordered by relative
    /// order and then registration order.
    #[must_use]
    pub fn deployers_for_stage(&self, stage: &Stage) -> Vec<Arc<dyn Deployer>> {
        let Ok(stage) = self.stages.resolve(stage) else {
            return Vec::new();
        };
        let inner = self.inner.read();
        let mut matching: Vec<&Registration> =
            inner.entries.iter().filter(|r| r.stage == stage).collect();
        matching.sort_by_key(|r| (r.deployer.relative_order(), r.seq));
        matching.into_iter().map(|r| Arc::clone(&r.deployer)).collect()
    }

    /// Returns a deployer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Deployer>> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|r| r.deployer.name() == name)
            .map(|r| Arc::clone(&r.deployer))
    }

    /// Returns all deployer names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|r| r.deployer.name().to_string())
            .collect()
    }

    /// Returns the number of registered deployers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if no deployers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl Default for DeployerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
