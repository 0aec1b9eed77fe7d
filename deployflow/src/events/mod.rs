//! Lifecycle events emitted by the controller.
//!
//! Every event carries a JSON payload with at least a `timestamp` field.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A deployment tree was materialized.
pub const DEPLOYMENT_ADDED: &str = "deployment.added";
/// A deployment tree reached the floor and was dropped.
pub const DEPLOYMENT_REMOVED: &str = "deployment.removed";
/// A deployment entered a stage.
pub const STAGE_ENTERED: &str = "unit.stage_entered";
/// A deployment left a stage.
pub const STAGE_LEFT: &str = "unit.stage_left";
/// A deploy step failed.
pub const UNIT_FAILED: &str = "unit.failed";
/// A deployment is waiting on dependencies.
pub const UNIT_PARKED: &str = "unit.parked";
/// A batch finished.
pub const BATCH_COMPLETED: &str = "batch.completed";
