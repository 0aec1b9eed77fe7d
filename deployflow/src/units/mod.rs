//! Deployment units and the arena that owns them.

mod arena;
mod attachments;
mod deployment;
mod unit;

pub use arena::{UnitArena, UnitId};
pub use attachments::{AttachmentKey, Attachments, Lookup};
pub use deployment::Deployment;
pub use unit::{DeploymentUnit, UnitKind};
