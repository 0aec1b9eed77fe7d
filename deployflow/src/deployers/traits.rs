//! Deployer plugin traits.
//!
//! A deployer is a black-box participant in one stage. Its capabilities are
//! split into small traits so that plain deployers only implement what they
//! use: [`StageBound`] places it in the chain, [`TypedIo`] declares the
//! attachments it reads and writes, and [`Deployable`] does the work.

use crate::stages::Stage;
use crate::units::{AttachmentKey, DeploymentUnit, UnitKind};
use async_trait::async_trait;
use std::fmt::Debug;

/// Placement of a deployer in the stage chain.
pub trait StageBound {
    /// Returns the stage this deployer runs at.
    fn stage(&self) -> &Stage;

    /// Tie-break among deployers of the same stage. Lower runs first.
    fn relative_order(&self) -> i32 {
        0
    }

    /// Only run against top-level units.
    fn top_level_only(&self) -> bool {
        false
    }

    /// Only run against component units.
    fn components_only(&self) -> bool {
        false
    }

    /// Also run against component units.
    fn wants_components(&self) -> bool {
        false
    }
}

/// Attachments a deployer consumes and produces.
pub trait TypedIo {
    /// Returns the attachment keys this deployer reads.
    fn inputs(&self) -> &[AttachmentKey] {
        &[]
    }

    /// Returns the attachment keys this deployer writes.
    fn outputs(&self) -> &[AttachmentKey] {
        &[]
    }

    /// If set, the deployer is skipped for units that lack a value under
    /// this key.
    fn required_input(&self) -> Option<&AttachmentKey> {
        None
    }
}

/// The work a deployer performs.
#[async_trait]
pub trait Deployable: Send + Sync {
    /// Applies the deployer to a unit entering its stage.
    async fn deploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()>;

    /// Reverts [`Deployable::deploy`] for a unit leaving the stage.
    ///
    /// Errors are logged by the caller and otherwise ignored.
    async fn undeploy(&self, _unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A registered stage participant.
pub trait Deployer: StageBound + TypedIo + Deployable + Send + Sync + Debug {
    /// Returns the unique deployer name.
    fn name(&self) -> &str;
}

/// Returns true if `deployer` should run against `unit`.
pub fn is_relevant(deployer: &dyn Deployer, unit: &DeploymentUnit) -> bool {
    let kind = unit.kind();
    if deployer.top_level_only() && kind != UnitKind::TopLevel {
        return false;
    }
    if deployer.components_only() {
        if kind != UnitKind::Component {
            return false;
        }
    } else if kind == UnitKind::Component && !deployer.wants_components() {
        return false;
    }
    deployer
        .required_input()
        .map_or(true, |key| unit.attachments().is_present(key))
}
