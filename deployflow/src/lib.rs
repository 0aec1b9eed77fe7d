//! # Deployflow
//!
//! A staged deployment controller.
//!
//! Deployflow drives deployment units through an ordered chain of stages,
//! from `NotInstalled` up to `Installed`, with support for:
//!
//! - **Pluggable deployers**: each deployer is bound to one stage and runs
//!   against every relevant unit entering it
//! - **Single-step transitions**: units move one stage at a time, forward
//!   or back, and a failed step is unwound in reverse
//! - **Dependency tracking**: units wait for the deployments they need and
//!   are pulled back when those deployments retreat
//! - **Completeness reporting**: failures and unmet dependencies are
//!   collected into an incomplete deployment report
//! - **Event-driven observability**: lifecycle events and structured logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deployflow::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(DeployerRegistry::new());
//! registry.add_deployer(Arc::new(FnDeployer::new("parse", Stage::PARSE, |unit| {
//!     unit.attachments_mut().put_named("parsed", true);
//!     Ok(())
//! })))?;
//!
//! let mut controller = DeploymentController::new(registry)?;
//! controller.deploy(Deployment::new("app.war")).await?;
//! controller.bounce(&Stage::DESCRIBE, true, &["app.war"]).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod controller;
pub mod dependency;
pub mod deployers;
pub mod errors;
pub mod events;
pub mod observability;
pub mod processor;
pub mod stages;
pub mod testing;
pub mod units;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ControllerConfig;
    pub use crate::controller::{
        ControllerBuilder, DeploymentController, IncompleteDeploymentReport,
    };
    pub use crate::dependency::{DependencyItem, MissingDependency, UnitState};
    pub use crate::deployers::{
        Deployable, Deployer, DeployerConfig, DeployerRegistry, FnDeployer, StageBound,
        TypedIo,
    };
    pub use crate::errors::{
        DeployflowError, DeploymentError, IncompleteDeploymentError, RegistryError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::stages::{Stage, StageTable};
    pub use crate::units::{AttachmentKey, Deployment, DeploymentUnit, UnitKind};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
