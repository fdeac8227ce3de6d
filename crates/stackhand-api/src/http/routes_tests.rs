use super::*;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use stackhand_config::Config;
use stackhand_cron::{CronScheduler, SchedulerOptions};
use stackhand_deploy::DeployRunner;
use stackhand_envfile::FileEnvStore;
use stackhand_protocols::{
    ExecError, ExecOutput, ExecRequest, StackExecutor, StackOperation,
};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use crate::error::ApiError;
use crate::server::{ApiServer, ServerConfig};

const TOKEN: &str = "s3cret";
const ENV: &str = "ALPHA_IMAGE_TAG=v1\n";

// ============================================================================
// Test Helpers
// ============================================================================

/// Cron runs block on the gate; deployments succeed or fail immediately.
struct FakeExecutor {
    gate: Arc<Semaphore>,
    fail_deploys: bool,
}

#[async_trait]
impl StackExecutor for FakeExecutor {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutput, ExecError> {
        if request.operations.contains(&StackOperation::VarsOnly) {
            let _permit = self.gate.acquire().await.unwrap();
            return Ok(ExecOutput::default());
        }
        if self.fail_deploys {
            return Err(ExecError::CommandFailed {
                program: "docker".to_string(),
                code: Some(1),
                output: ExecOutput::new("", "manifest unknown\n"),
            });
        }
        Ok(ExecOutput::new("deployed\n", ""))
    }
}

struct Harness {
    _dir: TempDir,
    stacks_dir: PathBuf,
    env_file: PathBuf,
    gate: Arc<Semaphore>,
    app: Router,
}

async fn harness_with(fail_deploys: bool, token: Option<&str>) -> Harness {
    let dir = TempDir::new().unwrap();
    let stacks_dir = dir.path().join("stacks");
    fs::create_dir_all(stacks_dir.join("alpha")).unwrap();
    fs::write(
        stacks_dir.join("alpha").join("docker-compose.yml"),
        "services:\n  app:\n    image: nginx\n  worker:\n    labels:\n      - stackhand.cron.schedule=@yearly\n",
    )
    .unwrap();
    let env_file = dir.path().join(".env");
    fs::write(&env_file, ENV).unwrap();

    let mut config = Config::default();
    config.stacks_dir = stacks_dir.clone();
    config.env_file = env_file.clone();
    config.http.token = token.map(str::to_string);

    let gate = Arc::new(Semaphore::new(0));
    let executor = Arc::new(FakeExecutor {
        gate: gate.clone(),
        fail_deploys,
    });

    let scheduler = Arc::new(CronScheduler::new(
        &stacks_dir,
        executor.clone(),
        SchedulerOptions::default(),
    ));
    scheduler.start().await.unwrap();
    let runner = Arc::new(DeployRunner::new(
        &env_file,
        Arc::new(FileEnvStore::new()),
        executor,
    ));

    let state = Arc::new(AppState::new(Arc::new(config), scheduler, runner));
    Harness {
        _dir: dir,
        stacks_dir,
        env_file,
        gate,
        app: create_router(state),
    }
}

async fn harness() -> Harness {
    harness_with(false, Some(TOKEN)).await
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let h = harness().await;
    let (status, body) = send(&h.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scheduler"], "running");
    assert_eq!(body["jobs"], 1);
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_protected_routes_reject_missing_token() {
    let h = harness().await;
    let deploy_body = json!({"stack": "alpha", "tag": "v2"});

    for (method, uri, body) in [
        ("GET", "/cron/jobs", None),
        ("POST", "/cron/reload", None),
        ("POST", "/cron/jobs/alpha/worker/run", None),
        ("POST", "/deploy", Some(deploy_body.clone())),
    ] {
        let (status, _) = send(&h.app, method, uri, None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");

        let (status, _) = send(&h.app, method, uri, Some("wrong"), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    // Nothing was deployed.
    assert_eq!(fs::read_to_string(&h.env_file).unwrap(), ENV);
}

#[tokio::test]
async fn test_no_configured_token_rejects_everything() {
    let h = harness_with(false, None).await;
    let (status, _) = send(&h.app, "GET", "/cron/jobs", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Deploy
// ============================================================================

#[tokio::test]
async fn test_deploy_success() {
    let h = harness().await;
    let (status, body) = send(
        &h.app,
        "POST",
        "/deploy",
        Some(TOKEN),
        Some(json!({"stack": "alpha", "tag": "v2"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "stack": "alpha", "tag": "v2", "stdout": "deployed"})
    );
    assert_eq!(fs::read_to_string(&h.env_file).unwrap(), "ALPHA_IMAGE_TAG=v2\n");
}

#[tokio::test]
async fn test_deploy_invalid_tag_is_bad_request() {
    let h = harness().await;
    let (status, body) = send(
        &h.app,
        "POST",
        "/deploy",
        Some(TOKEN),
        Some(json!({"stack": "alpha", "tag": "v2#1"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid tag"));
    assert_eq!(fs::read_to_string(&h.env_file).unwrap(), ENV);
}

#[tokio::test]
async fn test_deploy_failure_reports_rollback() {
    let h = harness_with(true, Some(TOKEN)).await;
    let (status, body) = send(
        &h.app,
        "POST",
        "/deploy",
        Some(TOKEN),
        Some(json!({"stack": "alpha", "tag": "v2"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "deployment failed for stack=alpha");
    assert_eq!(body["stderr"], "manifest unknown\n");
    assert_eq!(body["rollback"], json!({"status": "restored"}));
    assert_eq!(fs::read_to_string(&h.env_file).unwrap(), ENV);
}

// ============================================================================
// Cron
// ============================================================================

#[tokio::test]
async fn test_list_jobs() {
    let h = harness().await;
    let (status, body) = send(&h.app, "GET", "/cron/jobs", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let job = &body["jobs"][0];
    assert_eq!(job["stack"], "alpha");
    assert_eq!(job["service"], "worker");
    assert_eq!(job["schedule"], "@yearly");
    assert_eq!(job["run_on_deploy"], false);
    assert_eq!(job["running"], false);
    assert!(job["next_run"].is_string());
}

#[tokio::test]
async fn test_run_job_started_then_conflict() {
    let h = harness().await;

    let (status, body) = send(&h.app, "POST", "/cron/jobs/alpha/worker/run", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "started");
    assert_eq!(body["job"], "alpha/worker");

    let (status, body) = send(&h.app, "POST", "/cron/jobs/alpha/worker/run", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "skipped");

    let (_, body) = send(&h.app, "GET", "/cron/jobs", Some(TOKEN), None).await;
    assert_eq!(body["jobs"][0]["running"], true);

    h.gate.add_permits(10);
}

#[tokio::test]
async fn test_run_unknown_job_is_not_found() {
    let h = harness().await;
    let (status, body) = send(&h.app, "POST", "/cron/jobs/alpha/app/run", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown job: alpha/app");
}

#[tokio::test]
async fn test_reload() {
    let h = harness().await;
    fs::create_dir_all(h.stacks_dir.join("beta")).unwrap();
    fs::write(
        h.stacks_dir.join("beta").join("docker-compose.yml"),
        "services:\n  sync:\n    labels: [stackhand.cron.schedule=@daily]\n",
    )
    .unwrap();

    let (status, body) = send(&h.app, "POST", "/cron/reload", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"jobs": 2}));

    fs::write(
        h.stacks_dir.join("beta").join("docker-compose.yml"),
        "services:\n  sync:\n    labels: [stackhand.cron.schedule=nonsense]\n",
    )
    .unwrap();
    let (status, body) = send(&h.app, "POST", "/cron/reload", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("beta"));

    // The previous set is still active.
    let (_, body) = send(&h.app, "GET", "/cron/jobs", Some(TOKEN), None).await;
    assert_eq!(body["count"], 2);
}

// ============================================================================
// Server
// ============================================================================

#[tokio::test]
async fn test_server_refuses_to_start_without_token() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(Config::default());
    let executor = Arc::new(FakeExecutor {
        gate: Arc::new(Semaphore::new(0)),
        fail_deploys: false,
    });
    let scheduler = Arc::new(CronScheduler::new(
        dir.path(),
        executor.clone(),
        SchedulerOptions::default(),
    ));
    let runner = Arc::new(DeployRunner::new(
        dir.path().join(".env"),
        Arc::new(FileEnvStore::new()),
        executor,
    ));
    let state = Arc::new(AppState::new(config, scheduler, runner));

    let server = ApiServer::new(ServerConfig::new("127.0.0.1", 0), state);
    let result = server.run(async {}).await;
    assert!(matches!(result, Err(ApiError::MissingToken)));
}
