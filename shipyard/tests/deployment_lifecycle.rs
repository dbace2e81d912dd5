//! Deployment lifecycle tests driving the orchestration service end to end

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use publish_api::models::{Artifact, PublishResponse};
use serde_json::{json, Map, Value};
use tokio_test::{assert_err, assert_ok};

use shipyard::app::state::AppState;
use shipyard::authz::projects::StaticProjectDirectory;
use shipyard::deploy::executor::PipelineSettings;
use shipyard::deploy::publish::{Publisher, SimulatedPublisher};
use shipyard::errors::DeployError;
use shipyard::models::deployment::{DeploymentConfig, DeploymentRecord, DeploymentStatus};
use shipyard::models::metrics::TimeRange;
use shipyard::telemetry::SyntheticTelemetry;

/// Publisher whose backend always rejects the artifact
struct RejectingPublisher;

#[async_trait]
impl Publisher for RejectingPublisher {
    async fn publish(
        &self,
        _project_id: &str,
        _config: &DeploymentConfig,
        _artifact: &Artifact,
    ) -> Result<PublishResponse, DeployError> {
        Err(DeployError::ExternalService("quota exceeded".to_string()))
    }
}

fn app_with(publisher: Arc<dyn Publisher>, step_delay: Duration) -> AppState {
    AppState::with_collaborators(
        PipelineSettings { step_delay },
        publisher,
        Arc::new(SyntheticTelemetry),
        Arc::new(StaticProjectDirectory::new(HashMap::from([(
            "p1".to_string(),
            "alice".to_string(),
        )]))),
    )
}

fn fast_app() -> AppState {
    app_with(Arc::new(SimulatedPublisher), Duration::from_millis(1))
}

fn configuration(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn wait_for<F>(app: &AppState, deployment_id: &str, done: F) -> DeploymentRecord
where
    F: Fn(&DeploymentRecord) -> bool,
{
    for _ in 0..1000 {
        if let Some(record) = app.deployments.store().snapshot(deployment_id) {
            if done(&record) {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("deployment {} never reached the expected state", deployment_id);
}

async fn wait_for_terminal(app: &AppState, deployment_id: &str) -> DeploymentRecord {
    wait_for(app, deployment_id, |r| r.status.is_terminal()).await
}

fn assert_terminal_invariants(record: &DeploymentRecord) {
    match record.status {
        DeploymentStatus::Success => {
            assert!(record.url.as_deref().is_some_and(|url| !url.is_empty()));
            assert!(record.preview_url.is_some());
            assert!(record.error.is_none());
        }
        DeploymentStatus::Failed => {
            assert!(record.error.is_some());
            assert!(record.url.is_none());
            assert!(record.preview_url.is_none());
        }
        DeploymentStatus::Cancelled => {
            assert!(record.url.is_none());
            assert!(record.error.is_none());
        }
        status => panic!("record is not terminal: {}", status),
    }
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn successful_deployment_publishes_url() {
    let app = fast_app();

    let record = assert_ok!(app.deployments.start(
        "p1",
        "cloudflare-pages",
        configuration(json!({ "buildCommand": "npm run build", "outputDirectory": "dist" })),
    ));
    assert_eq!(record.status, DeploymentStatus::Pending);
    assert!(record.completed_at.is_none());

    wait_for_terminal(&app, &record.id).await;

    let status = app.deployments.get_status("p1").unwrap();
    assert_eq!(status.id, record.id);
    assert_eq!(status.status, DeploymentStatus::Success);
    assert_eq!(status.url.as_deref(), Some("https://p1.pages.dev"));
    assert_terminal_invariants(&status);

    // Re-reading a finished record never changes it
    assert_eq!(app.deployments.get_status("p1").unwrap(), status);

    let logs = app.deployments.get_logs("p1", None);
    assert_eq!(logs.len(), 8);
    assert_eq!(logs[2].message, "Running build: npm run build");
    assert_eq!(logs[7].message, "Deployment completed successfully");
}

#[tokio::test]
async fn unsupported_platform_creates_nothing() {
    let app = fast_app();
    let before = app.deployments.get_history("p1", 10);

    let err = assert_err!(app
        .deployments
        .start("p1", "invalid-platform", Map::new()));
    assert_eq!(err.kind(), "ValidationError");
    assert_eq!(err.to_string(), "Unsupported platform: invalid-platform");

    assert_eq!(app.deployments.get_history("p1", 10), before);
    assert!(app.deployments.get_status("p1").is_none());
}

#[tokio::test]
async fn malformed_configuration_is_rejected() {
    let app = fast_app();

    let err = assert_err!(app.deployments.start(
        "p1",
        "netlify",
        configuration(json!({ "environmentVariables": { "PORT": 8080 } })),
    ));
    assert!(matches!(err, DeployError::Validation(_)));
    assert_eq!(app.deployments.store().count("p1"), 0);
}

#[tokio::test]
async fn publish_failure_marks_deployment_failed() {
    let app = app_with(Arc::new(RejectingPublisher), Duration::from_millis(1));

    let record = assert_ok!(app.deployments.start("p1", "vercel", Map::new()));
    let failed = wait_for_terminal(&app, &record.id).await;

    assert_eq!(failed.status, DeploymentStatus::Failed);
    assert_eq!(
        failed.error.as_deref(),
        Some("External service error: quota exceeded")
    );
    assert_terminal_invariants(&failed);

    let last = failed.logs.last().unwrap();
    assert_eq!(last.message, "Deployment failed: External service error: quota exceeded");
}

#[tokio::test]
async fn rollback_to_failed_deployment_is_refused() {
    let app = app_with(Arc::new(RejectingPublisher), Duration::from_millis(1));
    let record = assert_ok!(app.deployments.start("p1", "netlify", Map::new()));
    wait_for_terminal(&app, &record.id).await;

    let err = assert_err!(app.deployments.rollback("p1", &record.id));
    assert_eq!(err.kind(), "InvalidStateError");
    assert!(err.to_string().contains("successful deployments"));
    assert_eq!(app.deployments.store().count("p1"), 1);
}

#[tokio::test]
async fn rollback_to_running_deployment_is_refused() {
    let app = app_with(Arc::new(SimulatedPublisher), Duration::from_millis(100));
    let record = assert_ok!(app.deployments.start("p1", "netlify", Map::new()));

    let err = assert_err!(app.deployments.rollback("p1", &record.id));
    assert!(matches!(err, DeployError::InvalidState(_)));
    assert_eq!(app.deployments.store().count("p1"), 1);

    app.shutdown(Duration::from_millis(10)).await.unwrap();
}

#[tokio::test]
async fn rollback_of_unknown_deployment_is_not_found() {
    let app = fast_app();
    let err = assert_err!(app.deployments.rollback("p1", "missing"));
    assert_eq!(err.kind(), "NotFoundError");
}

#[tokio::test]
async fn rollback_redeploys_successful_configuration() {
    let app = fast_app();
    let config = configuration(json!({ "buildCommand": "yarn build", "outputDirectory": "public" }));

    let target = assert_ok!(app.deployments.start("p1", "firebase-hosting", config.clone()));
    wait_for_terminal(&app, &target.id).await;

    let rollback = assert_ok!(app.deployments.rollback("p1", &target.id));
    assert_eq!(rollback.status, DeploymentStatus::Pending);
    assert!(rollback.is_rollback);
    assert_eq!(rollback.rollback_from_id.as_deref(), Some(target.id.as_str()));
    assert_eq!(rollback.platform, target.platform);
    assert_eq!(rollback.configuration, config);

    let finished = wait_for_terminal(&app, &rollback.id).await;
    assert_eq!(finished.status, DeploymentStatus::Success);
    assert_eq!(app.deployments.get_status("p1").unwrap().id, rollback.id);
}

#[tokio::test]
async fn cancel_while_building_stops_pipeline() {
    let app = app_with(Arc::new(SimulatedPublisher), Duration::from_millis(50));
    let record = assert_ok!(app.deployments.start("p1", "aws-amplify", Map::new()));

    wait_for(&app, &record.id, |r| r.status == DeploymentStatus::Building).await;

    let cancelled = assert_ok!(app.deployments.cancel("p1", &record.id));
    assert_eq!(cancelled.status, DeploymentStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    let status = app.deployments.get_status("p1").unwrap();
    assert_eq!(status.status, DeploymentStatus::Cancelled);
    let logs_at_cancel = app.deployments.get_logs("p1", Some(&record.id));
    assert_eq!(logs_at_cancel.last().unwrap().message, "Deployment cancelled");

    // Let the executor reach its next step boundary
    app.shutdown(Duration::from_secs(2)).await.unwrap();

    let after = app.deployments.get_status("p1").unwrap();
    assert_eq!(after, status);
    assert_terminal_invariants(&after);
    assert_eq!(app.deployments.get_logs("p1", Some(&record.id)), logs_at_cancel);
}

#[tokio::test]
async fn cancel_while_pending_skips_every_step() {
    let app = app_with(Arc::new(SimulatedPublisher), Duration::from_millis(200));
    let record = assert_ok!(app.deployments.start("p1", "netlify", Map::new()));

    // The pipeline task has not been polled yet on this runtime
    assert_eq!(
        app.deployments.get_status("p1").unwrap().status,
        DeploymentStatus::Pending
    );

    let cancelled = assert_ok!(app.deployments.cancel("p1", &record.id));
    assert_eq!(cancelled.status, DeploymentStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    app.shutdown(Duration::from_secs(2)).await.unwrap();

    let after = app.deployments.get_status("p1").unwrap();
    assert_eq!(after.status, DeploymentStatus::Cancelled);
    assert_terminal_invariants(&after);

    let logs = app.deployments.get_logs("p1", Some(&record.id));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Deployment cancelled");
}

#[tokio::test]
async fn cancel_of_finished_deployment_is_noop() {
    let app = fast_app();
    let record = assert_ok!(app.deployments.start("p1", "github-pages", Map::new()));
    let finished = wait_for_terminal(&app, &record.id).await;

    let after_cancel = assert_ok!(app.deployments.cancel("p1", &record.id));
    assert_eq!(after_cancel, finished);
    assert_eq!(app.deployments.get_status("p1").unwrap(), finished);
}

#[tokio::test]
async fn cancel_of_foreign_deployment_is_not_found() {
    let app = fast_app();
    let record = assert_ok!(app.deployments.start("p1", "vercel", Map::new()));

    let err = assert_err!(app.deployments.cancel("p2", &record.id));
    assert_eq!(err.kind(), "NotFoundError");
    assert!(app.deployments.get_logs("p2", Some(&record.id)).is_empty());
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let app = fast_app();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let record = assert_ok!(app.deployments.start("p1", "netlify", Map::new()));
        ids.push(record.id);
    }

    let history = app.deployments.get_history("p1", 2);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, ids[2]);
    assert_eq!(history[1].id, ids[1]);

    assert_eq!(app.deployments.get_history("p1", 10).len(), 3);
    assert!(app.deployments.get_history("p1", 0).is_empty());
    assert!(app.deployments.get_history("p2", 10).is_empty());
}

#[tokio::test]
async fn log_reads_are_prefixes_of_later_reads() {
    let app = app_with(Arc::new(SimulatedPublisher), Duration::from_millis(5));
    let record = assert_ok!(app.deployments.start("p1", "vercel", Map::new()));

    let mut previous = Vec::new();
    loop {
        let logs = app.deployments.get_logs("p1", Some(&record.id));
        assert!(logs.len() >= previous.len());
        assert_eq!(&logs[..previous.len()], previous.as_slice());
        for pair in logs.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }

        let done = app
            .deployments
            .store()
            .snapshot(&record.id)
            .is_some_and(|r| r.status.is_terminal());
        previous = logs;
        if done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(previous, app.deployments.get_logs("p1", Some(&record.id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_issue_unique_ids() {
    let app = Arc::new(fast_app());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..10 {
                let record = app.deployments.start("p1", "vercel", Map::new()).unwrap();
                assert_eq!(record.status, DeploymentStatus::Pending);
                ids.push(record.id);
            }
            ids
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(ids.insert(id));
        }
    }
    assert_eq!(ids.len(), 80);
    assert_eq!(app.deployments.store().count("p1"), 80);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
    for record in app.deployments.get_history("p1", 100) {
        assert_terminal_invariants(&record);
    }
}

#[tokio::test]
async fn metrics_cover_latest_successful_deployment() {
    let app = fast_app();

    let err = assert_err!(app.deployments.get_metrics("p1", TimeRange::OneDay).await);
    assert_eq!(err.kind(), "NotFoundError");

    let record = assert_ok!(app.deployments.start("p1", "vercel", Map::new()));
    wait_for_terminal(&app, &record.id).await;

    let report = assert_ok!(app.deployments.get_metrics("p1", TimeRange::SevenDays).await);
    assert_eq!(report.deployment_id, record.id);
    assert_eq!(report.time_range, TimeRange::SevenDays);
    assert_eq!(report.timeline.len(), 28);
    assert_eq!(
        report.requests,
        report.timeline.iter().map(|b| b.requests).sum::<u64>()
    );
    assert!((0.0..=1.0).contains(&report.uptime));
}

#[tokio::test]
async fn start_is_refused_after_shutdown() {
    let app = fast_app();
    app.shutdown(Duration::from_millis(10)).await.unwrap();

    let err = assert_err!(app.deployments.start("p1", "vercel", Map::new()));
    assert!(matches!(err, DeployError::Shutdown(_)));
    assert_eq!(app.deployments.store().count("p1"), 0);
}
