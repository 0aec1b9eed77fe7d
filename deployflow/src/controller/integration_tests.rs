//! End-to-end tests for the deployment controller.

use super::*;
use crate::config::ControllerConfig;
use crate::deployers::DeployerRegistry;
use crate::errors::DeployflowError;
use crate::events;
use crate::stages::{Stage, StageTable};
use crate::testing::{
    assert_blocked, assert_complete, assert_in_error, assert_stage, CallLog, FailingDeployer,
    RecordingDeployer, TestFixture,
};
use crate::units::Deployment;
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// One recording deployer on each of Parse, Describe, ClassLoader, PreReal
/// and Real, named d1..d5.
fn five_stage_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    for (name, stage) in [
        ("d1", Stage::PARSE),
        ("d2", Stage::DESCRIBE),
        ("d3", Stage::CLASSLOADER),
        ("d4", Stage::PRE_REAL),
        ("d5", Stage::REAL),
    ] {
        fixture.recording(name, stage).unwrap();
    }
    fixture
}

fn lenient() -> ControllerConfig {
    ControllerConfig::new().with_error_on_incomplete(false)
}

fn into_report(err: DeployflowError) -> IncompleteDeploymentReport {
    match err {
        DeployflowError::Incomplete(incomplete) => incomplete.report,
        other => panic!("expected an incomplete deployment, got {other}"),
    }
}

#[tokio::test]
async fn test_deploy_runs_every_stage_in_order() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    controller.deploy(Deployment::new("app")).await.unwrap();

    assert_stage(&controller, "app", &Stage::INSTALLED);
    assert_eq!(
        fixture.log.summary(),
        vec![
            "deploy d1 app",
            "deploy d2 app",
            "deploy d3 app",
            "deploy d4 app",
            "deploy d5 app",
        ]
    );
    assert_complete(&controller);
}

#[tokio::test]
async fn test_change_down_and_back_up() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    fixture.log.clear();

    controller.change(&Stage::PARSE, true, &["app"]).await.unwrap();
    assert_stage(&controller, "app", &Stage::PARSE);
    assert_eq!(
        fixture.log.summary(),
        vec![
            "undeploy d5 app",
            "undeploy d4 app",
            "undeploy d3 app",
            "undeploy d2 app",
        ]
    );

    fixture.log.clear();
    controller.change(&Stage::REAL, true, &["app"]).await.unwrap();
    assert_stage(&controller, "app", &Stage::REAL);
    assert_eq!(controller.requested_stage("app"), Some(Stage::REAL));
    assert_eq!(
        fixture.log.summary(),
        vec![
            "deploy d2 app",
            "deploy d3 app",
            "deploy d4 app",
            "deploy d5 app",
        ]
    );
}

#[tokio::test]
async fn test_change_to_current_stage_is_a_no_op() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    fixture.log.clear();

    controller
        .change(&Stage::INSTALLED, true, &["app"])
        .await
        .unwrap();
    controller.change(&Stage::INSTALLED, true, &[]).await.unwrap();

    assert!(fixture.log.is_empty());
    assert_stage(&controller, "app", &Stage::INSTALLED);
}

#[tokio::test]
async fn test_every_stage_is_entered_one_step_at_a_time() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    controller.deploy(Deployment::new("app")).await.unwrap();

    let entered: Vec<String> = fixture
        .events
        .events_of_type(events::STAGE_ENTERED)
        .into_iter()
        .filter_map(|(_, data)| data)
        .map(|data| data["stage"].as_str().unwrap_or_default().to_string())
        .collect();
    let expected: Vec<String> = Stage::STANDARD[1..]
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(entered, expected);
}

#[tokio::test]
async fn test_failed_step_unwinds_and_records_error() {
    let fixture = TestFixture::new();
    fixture.recording("d1", Stage::PARSE).unwrap();
    fixture.recording("d2", Stage::PARSE).unwrap();
    fixture.failing("d3", Stage::PARSE, None).unwrap();
    fixture.recording("d4", Stage::PARSE).unwrap();
    fixture.recording("d5", Stage::PARSE).unwrap();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    let report = into_report(controller.deploy(Deployment::new("app")).await.unwrap_err());

    assert_eq!(
        fixture.log.summary(),
        vec![
            "deploy d1 app",
            "deploy d2 app",
            "undeploy d2 app",
            "undeploy d1 app",
        ]
    );
    assert_in_error(&controller, "app");
    assert_eq!(controller.unit_stage("app"), Some(Stage::NOT_INSTALLED));
    assert_eq!(report.failed_units(), vec!["app"]);
    let failure = &report.failures()["app"];
    assert_eq!(failure.failed_stage, Stage::PARSE);
    assert_eq!(failure.root_cause, "d3 failed");
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_deployment() {
    let fixture = five_stage_fixture();
    fixture.failing("bad", Stage::DESCRIBE, Some("a")).unwrap();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    let err = controller
        .deploy_all(vec![
            Deployment::new("a"),
            Deployment::new("b").depends_on("a", Stage::DESCRIBE, Stage::INSTALLED),
            Deployment::new("c"),
        ])
        .await
        .unwrap_err();
    let report = into_report(err);

    assert_in_error(&controller, "a");
    assert_eq!(controller.unit_stage("a"), Some(Stage::PRE_DESCRIBE));
    assert_stage(&controller, "b", &Stage::PRE_DESCRIBE);
    assert_blocked(&controller, "b", "a");
    assert_stage(&controller, "c", &Stage::INSTALLED);

    assert_eq!(report.failed_units(), vec!["a"]);
    assert_eq!(report.blocked_units(), vec!["b"]);
    assert!(report.blocked()["b"].missing[0].target_in_error);
    assert!(report
        .to_string()
        .contains("a {Required: Installed, Actual: ** ERROR **}"));
}

#[tokio::test]
async fn test_change_retries_a_failed_deployment() {
    let fixture = five_stage_fixture();
    let bad = fixture.failing("bad", Stage::DESCRIBE, Some("a")).unwrap();
    let mut controller = fixture.controller(lenient()).unwrap();
    controller
        .deploy_all(vec![
            Deployment::new("a"),
            Deployment::new("b").depends_on("a", Stage::DESCRIBE, Stage::INSTALLED),
        ])
        .await
        .unwrap();
    assert_in_error(&controller, "a");

    bad.set_failing(false);
    controller
        .change(&Stage::INSTALLED, true, &["a"])
        .await
        .unwrap();

    assert_stage(&controller, "a", &Stage::INSTALLED);
    assert_stage(&controller, "b", &Stage::INSTALLED);
    assert_complete(&controller);
}

#[tokio::test]
async fn test_bounce_cycles_down_and_back() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    fixture.log.clear();

    controller
        .bounce(&Stage::DESCRIBE, true, &["app"])
        .await
        .unwrap();

    assert_eq!(
        fixture.log.summary(),
        vec![
            "undeploy d5 app",
            "undeploy d4 app",
            "undeploy d3 app",
            "deploy d3 app",
            "deploy d4 app",
            "deploy d5 app",
        ]
    );
    assert_stage(&controller, "app", &Stage::INSTALLED);
    assert_eq!(controller.requested_stage("app"), Some(Stage::INSTALLED));
}

#[tokio::test]
async fn test_bounce_skips_deployments_at_or_below_stage() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    controller.change(&Stage::PARSE, true, &["app"]).await.unwrap();
    fixture.log.clear();

    controller
        .bounce(&Stage::DESCRIBE, true, &["app"])
        .await
        .unwrap();

    assert!(fixture.log.is_empty());
    assert_stage(&controller, "app", &Stage::PARSE);
}

#[tokio::test]
async fn test_bounce_returns_failed_deployment_to_where_it_stopped() {
    let fixture = five_stage_fixture();
    let bad = fixture.failing("bad", Stage::DESCRIBE, Some("a")).unwrap();
    let mut controller = fixture.controller(lenient()).unwrap();
    controller.deploy(Deployment::new("a")).await.unwrap();
    assert_in_error(&controller, "a");
    assert_eq!(controller.unit_stage("a"), Some(Stage::PRE_DESCRIBE));

    bad.set_failing(false);
    fixture.log.clear();
    controller
        .bounce(&Stage::NOT_INSTALLED, false, &["a"])
        .await
        .unwrap();

    assert_eq!(fixture.log.summary(), vec!["undeploy d1 a", "deploy d1 a"]);
    assert_in_error(&controller, "a");
    assert_eq!(controller.unit_stage("a"), Some(Stage::PRE_DESCRIBE));
    assert_eq!(controller.requested_stage("a"), Some(Stage::INSTALLED));
}

#[tokio::test]
async fn test_bounce_returns_parked_deployment_to_where_it_waited() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(lenient()).unwrap();
    controller
        .deploy(Deployment::new("web").depends_on("db", Stage::DESCRIBE, Stage::INSTALLED))
        .await
        .unwrap();
    fixture.log.clear();

    controller
        .bounce(&Stage::NOT_INSTALLED, false, &["web"])
        .await
        .unwrap();

    assert_eq!(fixture.log.summary(), vec!["undeploy d1 web", "deploy d1 web"]);
    assert_stage(&controller, "web", &Stage::PRE_DESCRIBE);
    assert_blocked(&controller, "web", "db");
    assert_eq!(controller.requested_stage("web"), Some(Stage::INSTALLED));
}

#[tokio::test]
async fn test_retreat_pulls_back_dependents_first() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller
        .deploy_all(vec![
            Deployment::new("a"),
            Deployment::new("b").depends_on("a", Stage::DESCRIBE, Stage::INSTALLED),
        ])
        .await
        .unwrap();
    fixture.log.clear();

    controller.change(&Stage::PARSE, true, &["a"]).await.unwrap();

    assert_eq!(
        fixture.log.summary(),
        vec![
            "undeploy d5 b",
            "undeploy d4 b",
            "undeploy d3 b",
            "undeploy d2 b",
            "undeploy d5 a",
            "undeploy d4 a",
            "undeploy d3 a",
            "undeploy d2 a",
        ]
    );
    assert_stage(&controller, "b", &Stage::PRE_DESCRIBE);
    assert_eq!(controller.requested_stage("b"), Some(Stage::INSTALLED));
    assert_blocked(&controller, "b", "a");

    fixture.log.clear();
    controller
        .change(&Stage::INSTALLED, true, &["a"])
        .await
        .unwrap();
    assert_eq!(
        fixture.log.summary(),
        vec![
            "deploy d2 a",
            "deploy d3 a",
            "deploy d4 a",
            "deploy d5 a",
            "deploy d2 b",
            "deploy d3 b",
            "deploy d4 b",
            "deploy d5 b",
        ]
    );
    assert_complete(&controller);
}

#[tokio::test]
async fn test_missing_dependency_is_reported_then_resolved() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    let report = into_report(
        controller
            .deploy(Deployment::new("web").depends_on("db", Stage::DESCRIBE, Stage::INSTALLED))
            .await
            .unwrap_err(),
    );

    assert_eq!(report.blocked_units(), vec!["web"]);
    assert!(report.failed_units().is_empty());
    assert_eq!(report.blocked()["web"].missing[0].actual_state, None);
    assert_eq!(
        report.to_string(),
        "Incomplete Deployment listing:\n\n\
         DEPLOYMENTS MISSING DEPENDENCIES:\n  \
         Deployment \"web\" is missing the following dependencies:\n    \
         db {Required: Installed, Actual: ** NOT FOUND **}"
    );
    assert_stage(&controller, "web", &Stage::PRE_DESCRIBE);

    controller.deploy(Deployment::new("db")).await.unwrap();
    assert_stage(&controller, "web", &Stage::INSTALLED);
    assert_complete(&controller);
}

#[tokio::test]
async fn test_lenient_mode_leaves_check_to_the_caller() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(lenient()).unwrap();

    controller
        .deploy(Deployment::new("web").depends_on("db", Stage::PARSE, Stage::INSTALLED))
        .await
        .unwrap();

    assert_stage(&controller, "web", &Stage::NOT_INSTALLED);
    let err = controller.check_complete().unwrap_err();
    assert_eq!(into_report(err).blocked_units(), vec!["web"]);
    assert!(controller.check_complete_for(&["web"]).is_err());
}

#[tokio::test]
async fn test_deployer_declared_dependency_is_dropped_on_retreat() {
    let fixture = TestFixture::new();
    fixture
        .register(
            RecordingDeployer::new("scan", Stage::DESCRIBE, &fixture.log).with_dependency(
                "db",
                Stage::PRE_REAL,
                Stage::INSTALLED,
            ),
        )
        .unwrap();
    let mut controller = fixture.controller(lenient()).unwrap();

    controller.deploy(Deployment::new("web")).await.unwrap();
    assert_stage(&controller, "web", &Stage::POST_CLASSLOADER);
    assert_blocked(&controller, "web", "db");

    controller.change(&Stage::PARSE, true, &["web"]).await.unwrap();
    assert_stage(&controller, "web", &Stage::PARSE);
    assert!(controller.unit("web").unwrap().dependencies().is_empty());
    assert!(controller.waiting_on("web").is_empty());
}

#[tokio::test]
async fn test_tree_deploys_parent_first_and_undeploys_children_first() {
    let fixture = TestFixture::new();
    fixture
        .register(RecordingDeployer::new("d", Stage::PARSE, &fixture.log).with_components())
        .unwrap();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();

    controller
        .deploy(
            Deployment::new("app.ear")
                .with_component(Deployment::new("app.ear#pool"))
                .with_child(Deployment::new("web.war")),
        )
        .await
        .unwrap();
    assert_stage(&controller, "web.war", &Stage::INSTALLED);

    controller.undeploy("app.ear").await.unwrap();
    assert_eq!(
        fixture.log.summary(),
        vec![
            "deploy d app.ear",
            "deploy d app.ear#pool",
            "deploy d web.war",
            "undeploy d web.war",
            "undeploy d app.ear#pool",
            "undeploy d app.ear",
        ]
    );
    assert!(controller.unit("web.war").is_none());
    assert!(controller.deployment_names().is_empty());
}

#[tokio::test]
async fn test_removed_deployer_still_undeploys() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    assert!(fixture.registry.remove_deployer("d3").is_some());
    fixture.log.clear();

    controller.change(&Stage::PARSE, true, &["app"]).await.unwrap();
    assert!(fixture.log.undeployed().contains(&"d3".to_string()));

    fixture.log.clear();
    controller
        .change(&Stage::INSTALLED, true, &["app"])
        .await
        .unwrap();
    assert_eq!(fixture.log.deployed(), vec!["d2", "d4", "d5"]);
}

#[tokio::test]
async fn test_undeploy_failures_do_not_stop_removal() {
    let fixture = five_stage_fixture();
    fixture
        .register(
            FailingDeployer::new("flaky", Stage::REAL, &fixture.log)
                .with_deploy_failure(false)
                .failing_undeploy(),
        )
        .unwrap();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    fixture.log.clear();

    controller.undeploy("app").await.unwrap();

    assert_eq!(
        fixture.log.undeployed(),
        vec!["d5", "d4", "d3", "d2", "d1"]
    );
    assert!(controller.unit("app").is_none());
}

#[tokio::test]
async fn test_redeploy_replaces_the_live_tree() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();
    fixture.log.clear();
    fixture.events.clear();

    controller.deploy(Deployment::new("app")).await.unwrap();

    assert_eq!(
        fixture.log.summary(),
        vec![
            "undeploy d5 app",
            "undeploy d4 app",
            "undeploy d3 app",
            "undeploy d2 app",
            "undeploy d1 app",
            "deploy d1 app",
            "deploy d2 app",
            "deploy d3 app",
            "deploy d4 app",
            "deploy d5 app",
        ]
    );
    let types = fixture.events.event_types();
    let removed = types.iter().position(|t| t == events::DEPLOYMENT_REMOVED);
    let added = types.iter().position(|t| t == events::DEPLOYMENT_ADDED);
    assert!(removed.is_some() && removed < added);
    assert_eq!(controller.deployment_names(), vec!["app"]);
}

#[tokio::test]
async fn test_add_deployment_rejects_duplicates_and_empty_names() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller.deploy(Deployment::new("app")).await.unwrap();

    let err = controller
        .add_deployment(Deployment::new("other").with_child(Deployment::new("app")))
        .unwrap_err();
    assert!(matches!(err, DeployflowError::DuplicateDeployment(name) if name == "app"));

    controller.add_deployment(Deployment::new("queued")).unwrap();
    assert!(matches!(
        controller.add_deployment(Deployment::new("queued")),
        Err(DeployflowError::DuplicateDeployment(_))
    ));
    assert!(matches!(
        controller.add_deployment(Deployment::new(" ")),
        Err(DeployflowError::InvalidDeployment(_))
    ));
    assert_eq!(controller.pending_names(), vec!["queued"]);
    assert!(controller.remove_deployment("queued").unwrap());
    assert!(controller.pending_names().is_empty());
}

#[tokio::test]
async fn test_unknown_names_are_rejected() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller
        .deploy(Deployment::new("app").with_child(Deployment::new("lib")))
        .await
        .unwrap();

    assert!(matches!(
        controller.change(&Stage::PARSE, true, &["nope"]).await,
        Err(DeployflowError::UnknownDeployment(name)) if name == "nope"
    ));
    assert!(matches!(
        controller.undeploy("nope").await,
        Err(DeployflowError::UnknownDeployment(_))
    ));
    assert!(matches!(
        controller.remove_deployment("lib"),
        Err(DeployflowError::InvalidDeployment(_))
    ));
    assert!(!controller.remove_deployment("nope").unwrap());
}

#[tokio::test]
async fn test_change_by_child_name_moves_whole_tree() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::default()).unwrap();
    controller
        .deploy(Deployment::new("app").with_child(Deployment::new("lib")))
        .await
        .unwrap();

    controller.change(&Stage::DESCRIBE, true, &["lib"]).await.unwrap();

    assert_stage(&controller, "app", &Stage::DESCRIBE);
    assert_stage(&controller, "lib", &Stage::DESCRIBE);
}

#[tokio::test]
async fn test_pass_limit_stops_the_batch() {
    let fixture = five_stage_fixture();
    let mut controller = fixture
        .controller(lenient().with_max_passes(3))
        .unwrap();

    controller.deploy(Deployment::new("app")).await.unwrap();

    assert_stage(&controller, "app", &Stage::POST_PARSE);
    let report = controller.incomplete_report();
    assert_eq!(report.blocked_units(), vec!["app"]);
    assert!(report
        .to_string()
        .contains("Deployment \"app\" stopped at PostParse (requested Installed)"));
}

#[tokio::test]
async fn test_events_cover_the_lifecycle() {
    let fixture = five_stage_fixture();
    fixture.failing("bad", Stage::PARSE, Some("broken")).unwrap();
    let mut controller = fixture.controller(lenient()).unwrap();

    controller
        .deploy_all(vec![
            Deployment::new("app"),
            Deployment::new("broken"),
            Deployment::new("web").depends_on("db", Stage::PARSE, Stage::INSTALLED),
        ])
        .await
        .unwrap();

    let types = fixture.events.event_types();
    assert_eq!(types.first().map(String::as_str), Some(events::DEPLOYMENT_ADDED));
    assert_eq!(types.last().map(String::as_str), Some(events::BATCH_COMPLETED));
    assert_eq!(fixture.events.events_of_type(events::STAGE_ENTERED).len(), 9);
    assert_eq!(fixture.events.events_of_type(events::UNIT_FAILED).len(), 1);
    assert_eq!(fixture.events.events_of_type(events::UNIT_PARKED).len(), 1);
    assert!(fixture
        .events
        .events()
        .iter()
        .all(|(_, data)| data.as_ref().is_some_and(|d| d.get("timestamp").is_some())));
}

#[tokio::test]
async fn test_events_can_be_disabled() {
    let fixture = five_stage_fixture();
    let mut controller = fixture.controller(ControllerConfig::new().with_events(false)).unwrap();

    controller.deploy(Deployment::new("app")).await.unwrap();

    assert!(fixture.events.is_empty());
}

#[tokio::test]
async fn test_builder_rejects_unknown_default_target() {
    let fixture = TestFixture::new();
    let err = fixture
        .controller(ControllerConfig::new().with_default_target("Running"))
        .unwrap_err();
    assert!(matches!(err, DeployflowError::UnknownStage(_)));
}

#[tokio::test]
async fn test_custom_default_target() {
    let fixture = five_stage_fixture();
    let mut controller = fixture
        .controller(ControllerConfig::new().with_default_target("Describe"))
        .unwrap();

    controller.deploy(Deployment::new("app")).await.unwrap();

    assert_stage(&controller, "app", &Stage::DESCRIBE);
    assert_eq!(fixture.log.deployed(), vec!["d1", "d2"]);
}

fn fetch_run_table() -> Arc<StageTable> {
    Arc::new(
        StageTable::builder()
            .stage("Fetch")
            .unwrap()
            .stage("Run")
            .unwrap()
            .build(),
    )
}

#[tokio::test]
async fn test_dependency_on_unknown_stage_is_rejected_at_add() {
    let registry = Arc::new(DeployerRegistry::with_stages(fetch_run_table()));
    let mut controller = DeploymentController::builder(registry)
        .with_config(ControllerConfig::new().with_default_target("Run"))
        .build()
        .unwrap();

    let err = controller
        .deploy(Deployment::new("web").depends_on("db", Stage::DESCRIBE, Stage::INSTALLED))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployflowError::UnknownStage(_)));
    assert!(controller.pending_names().is_empty());
    assert!(controller.deployment_names().is_empty());
}

#[tokio::test]
async fn test_declared_dependency_on_unknown_stage_blocks() {
    let stages = fetch_run_table();
    let fetch = stages.lookup("Fetch").unwrap();
    let log = CallLog::new();
    let registry = Arc::new(DeployerRegistry::with_stages(Arc::clone(&stages)));
    registry
        .add_deployer(Arc::new(
            RecordingDeployer::new("fetcher", fetch.clone(), &log).with_dependency(
                "db",
                Stage::DESCRIBE,
                Stage::INSTALLED,
            ),
        ))
        .unwrap();
    let mut controller = DeploymentController::builder(registry)
        .with_config(lenient().with_default_target("Run"))
        .build()
        .unwrap();

    controller.deploy(Deployment::new("web")).await.unwrap();

    assert_stage(&controller, "web", &fetch);
    assert_blocked(&controller, "web", "db");
    let report = controller.incomplete_report();
    assert_eq!(report.blocked_units(), vec!["web"]);
}
