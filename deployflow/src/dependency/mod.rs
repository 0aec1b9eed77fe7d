//! Dependency items and the tracker that resolves them.
//!
//! Units declare [`DependencyItem`]s; the [`DependencyTracker`] holds the
//! stage of every deployment and decides which forward steps may run and
//! which dependents must be pulled back when a target retreats.

mod item;
mod tracker;

pub use item::{DependencyInfo, DependencyItem, MissingDependency};
pub use tracker::{Advance, DependencyTracker, DeploymentContext, UnitState};
