//! Closure-backed deployer.

use super::{Deployable, Deployer, StageBound, TypedIo};
use crate::stages::Stage;
use crate::units::{AttachmentKey, DeploymentUnit};
use async_trait::async_trait;
use std::fmt::{self, Debug};

/// Function run by a [`FnDeployer`].
pub type DeployFn = Box<dyn Fn(&mut DeploymentUnit) -> anyhow::Result<()> + Send + Sync>;

/// Static description of a deployer.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    /// Unique name.
    pub name: String,
    /// Stage the deployer runs at.
    pub stage: Stage,
    /// Tie-break within the stage.
    pub relative_order: i32,
    /// Attachments read.
    pub inputs: Vec<AttachmentKey>,
    /// Attachments written.
    pub outputs: Vec<AttachmentKey>,
    /// Skip units without a value under this key.
    pub required_input: Option<AttachmentKey>,
    /// Only top-level units.
    pub top_level_only: bool,
    /// Only component units.
    pub components_only: bool,
    /// Include component units.
    pub wants_components: bool,
}

impl DeployerConfig {
    /// Creates a new config with default flags.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            stage,
            relative_order: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            required_input: None,
            top_level_only: false,
            components_only: false,
            wants_components: false,
        }
    }
}

/// A deployer built from a config and closures.
pub struct FnDeployer {
    config: DeployerConfig,
    deploy: DeployFn,
    undeploy: Option<DeployFn>,
}

impl FnDeployer {
    /// Creates a new function-based deployer.
    pub fn new<F>(name: impl Into<String>, stage: Stage, deploy: F) -> Self
    where
        F: Fn(&mut DeploymentUnit) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_config(DeployerConfig::new(name, stage), deploy)
    }

    /// Creates a deployer from a prepared config.
    pub fn from_config<F>(config: DeployerConfig, deploy: F) -> Self
    where
        F: Fn(&mut DeploymentUnit) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            config,
            deploy: Box::new(deploy),
            undeploy: None,
        }
    }

    /// Sets the undeploy function.
    #[must_use]
    pub fn with_undeploy<F>(mut self, undeploy: F) -> Self
    where
        F: Fn(&mut DeploymentUnit) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.undeploy = Some(Box::new(undeploy));
        self
    }

    /// Sets the relative order.
    #[must_use]
    pub fn with_relative_order(mut self, order: i32) -> Self {
        self.config.relative_order = order;
        self
    }

    /// Adds an input key.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<AttachmentKey>) -> Self {
        self.config.inputs.push(key.into());
        self
    }

    /// Adds an output key.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<AttachmentKey>) -> Self {
        self.config.outputs.push(key.into());
        self
    }

    /// Skips units without a value under `key`. The key is also recorded as
    /// an input.
    #[must_use]
    pub fn requiring(mut self, key: impl Into<AttachmentKey>) -> Self {
        let key = key.into();
        if !self.config.inputs.contains(&key) {
            self.config.inputs.push(key.clone());
        }
        self.config.required_input = Some(key);
        self
    }

    /// Restricts the deployer to top-level units.
    #[must_use]
    pub fn only_top_level(mut self) -> Self {
        self.config.top_level_only = true;
        self
    }

    /// Restricts the deployer to component units.
    #[must_use]
    pub fn only_components(mut self) -> Self {
        self.config.components_only = true;
        self
    }

    /// Includes component units.
    #[must_use]
    pub fn with_components(mut self) -> Self {
        self.config.wants_components = true;
        self
    }

    /// Returns the config.
    #[must_use]
    pub const fn config(&self) -> &DeployerConfig {
        &self.config
    }
}

impl Debug for FnDeployer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDeployer")
            .field("name", &self.config.name)
            .field("stage", &self.config.stage)
            .finish()
    }
}

impl StageBound for FnDeployer {
    fn stage(&self) -> &Stage {
        &self.config.stage
    }

    fn relative_order(&self) -> i32 {
        self.config.relative_order
    }

    fn top_level_only(&self) -> bool {
        self.config.top_level_only
    }

    fn components_only(&self) -> bool {
        self.config.components_only
    }

    fn wants_components(&self) -> bool {
        self.config.wants_components
    }
}

impl TypedIo for FnDeployer {
    fn inputs(&self) -> &[AttachmentKey] {
        &self.config.inputs
    }

    fn outputs(&self) -> &[AttachmentKey] {
        &self.config.outputs
    }

    fn required_input(&self) -> Option<&AttachmentKey> {
        self.config.required_input.as_ref()
    }
}

#[async_trait]
impl Deployable for FnDeployer {
    async fn deploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        (self.deploy)(unit)
    }

    async fn undeploy(&self, unit: &mut DeploymentUnit) -> anyhow::Result<()> {
        match &self.undeploy {
            Some(undeploy) => undeploy(unit),
            None => Ok(()),
        }
    }
}

impl Deployer for FnDeployer {
    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployers::is_relevant;
    use crate::units::{Deployment, UnitArena};

    #[tokio::test]
    async fn test_fn_deployer_writes_attachment() {
        let deployer = FnDeployer::new("meta", Stage::PARSE, |unit| {
            unit.attachments_mut().put_named("parsed", true);
            Ok(())
        })
        .with_output("parsed");

        assert_eq!(deployer.name(), "meta");
        assert_eq!(deployer.stage(), &Stage::PARSE);
        assert_eq!(deployer.outputs(), &[AttachmentKey::named("parsed")]);

        let mut arena = UnitArena::new();
        let id = arena.insert_tree(Deployment::new("app")).unwrap();
        let unit = arena.get_mut(id).unwrap();
        deployer.deploy(unit).await.unwrap();
        assert_eq!(
            unit.attachments().get_named::<bool>(&"parsed".into()),
            Some(&true)
        );
        deployer.undeploy(unit).await.unwrap();
    }

    #[test]
    fn test_relevance_filters() {
        let mut arena = UnitArena::new();
        let root = arena
            .insert_tree(
                Deployment::new("app")
                    .with_named_attachment("web.xml", "<web/>".to_string())
                    .with_child(Deployment::new("lib.jar"))
                    .with_component(Deployment::new("bean")),
            )
            .unwrap();
        let app = arena.get(root).unwrap();
        let lib = arena.by_name("lib.jar").unwrap();
        let bean = arena.by_name("bean").unwrap();

        let plain = FnDeployer::new("plain", Stage::REAL, |_| Ok(()));
        assert!(is_relevant(&plain, app));
        assert!(is_relevant(&plain, lib));
        assert!(!is_relevant(&plain, bean));

        let top = FnDeployer::new("top", Stage::REAL, |_| Ok(())).only_top_level();
        assert!(is_relevant(&top, app));
        assert!(!is_relevant(&top, lib));

        let comps = FnDeployer::new("comps", Stage::REAL, |_| Ok(())).only_components();
        assert!(!is_relevant(&comps, app));
        assert!(is_relevant(&comps, bean));

        let all = FnDeployer::new("all", Stage::REAL, |_| Ok(())).with_components();
        assert!(is_relevant(&all, bean));

        let web = FnDeployer::new("web", Stage::PARSE, |_| Ok(())).requiring("web.xml");
        assert!(is_relevant(&web, app));
        assert!(!is_relevant(&web, lib));
        assert_eq!(web.inputs(), &[AttachmentKey::named("web.xml")]);
    }
}
