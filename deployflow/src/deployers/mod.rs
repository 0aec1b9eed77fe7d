//! Deployer plugins and the registry that holds them.

mod fn_deployer;
mod registry;
mod traits;

pub use fn_deployer::{DeployFn, DeployerConfig, FnDeployer};
pub use registry::DeployerRegistry;
pub use traits::{is_relevant, Deployable, Deployer, StageBound, TypedIo};
