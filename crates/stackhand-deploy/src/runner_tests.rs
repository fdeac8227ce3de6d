use super::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use stackhand_envfile::FileEnvStore;
use stackhand_protocols::{EnvStoreError, ExecError, ExecOutput, StackTarget};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Executor that records requests and the env file content it ran under.
struct FakeExecutor {
    env_file: PathBuf,
    fail: bool,
    delay: Option<Duration>,
    requests: SyncMutex<Vec<ExecRequest>>,
    seen_env: SyncMutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeExecutor {
    fn new(env_file: &Path) -> Self {
        Self {
            env_file: env_file.to_path_buf(),
            fail: false,
            delay: None,
            requests: SyncMutex::new(Vec::new()),
            seen_env: SyncMutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    fn failing(env_file: &Path) -> Self {
        Self {
            fail: true,
            ..Self::new(env_file)
        }
    }

    fn slow(env_file: &Path, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(env_file)
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl StackExecutor for FakeExecutor {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutput, ExecError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if let Some(sink) = &request.sink {
            sink.push_stdout("pulling\n");
        }
        self.requests.lock().push(request);
        self.seen_env
            .lock()
            .push(fs::read_to_string(&self.env_file).unwrap_or_default());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(ExecError::CommandFailed {
                program: "docker".to_string(),
                code: Some(1),
                output: ExecOutput::new("partial\n", "pull failed\n"),
            });
        }
        Ok(ExecOutput::new("pulled\n", ""))
    }
}

/// File-backed store whose restore always fails.
struct BrokenRestoreStore(FileEnvStore);

impl EnvStore for BrokenRestoreStore {
    fn read(&self, path: &Path) -> Result<String, EnvStoreError> {
        self.0.read(path)
    }

    fn snapshot(&self, path: &Path) -> Result<EnvSnapshot, EnvStoreError> {
        self.0.snapshot(path)
    }

    fn update(&self, path: &Path, key: &str, value: &str) -> Result<String, EnvStoreError> {
        self.0.update(path, key, value)
    }

    fn restore(&self, path: &Path, _snapshot: &EnvSnapshot) -> Result<(), EnvStoreError> {
        Err(EnvStoreError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

const ENV: &str = "# image tags\nALPHA_IMAGE_TAG=v1\nOTHER=keep\n";

fn env_dir(content: Option<&str>) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join(".env");
    if let Some(content) = content {
        fs::write(&env_file, content).unwrap();
    }
    (dir, env_file)
}

fn runner(env_file: &Path, executor: Arc<FakeExecutor>) -> DeployRunner {
    DeployRunner::new(env_file, Arc::new(FileEnvStore::new()), executor)
}

fn alpha() -> StackDeployment {
    StackDeployment::for_stack("alpha")
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_deploy_updates_tag_and_runs_update() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::new(&env_file));
    let runner = runner(&env_file, executor.clone());

    let result = runner.deploy("alpha", &alpha(), "v2").await.unwrap();

    assert_eq!(result, DeployResult::ok("alpha", "v2", "pulled"));
    assert_eq!(
        fs::read_to_string(&env_file).unwrap(),
        "# image tags\nALPHA_IMAGE_TAG=v2\nOTHER=keep\n"
    );

    let request = executor.requests.lock()[0].clone();
    assert_eq!(request.target, StackTarget::Stacks(vec!["alpha".to_string()]));
    assert_eq!(request.operations, BTreeSet::from([StackOperation::Update]));
    // The executor runs against the new tag.
    assert!(executor.seen_env.lock()[0].contains("ALPHA_IMAGE_TAG=v2"));
}

#[tokio::test]
async fn test_deploy_appends_missing_tag() {
    let (_dir, env_file) = env_dir(Some("OTHER=keep"));
    let runner = runner(&env_file, Arc::new(FakeExecutor::new(&env_file)));

    runner.deploy("alpha", &alpha(), "v2").await.unwrap();

    assert_eq!(
        fs::read_to_string(&env_file).unwrap(),
        "OTHER=keep\nALPHA_IMAGE_TAG=v2\n"
    );
}

#[tokio::test]
async fn test_deploy_uses_configured_operations() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::new(&env_file));
    let runner = runner(&env_file, executor.clone());

    let deployment = StackDeployment::for_stack("web")
        .with_tag_env("WEB_TAG")
        .with_args(vec!["web".into(), "backup".into(), "update".into()]);
    runner.deploy("web", &deployment, "2024.1").await.unwrap();

    assert_eq!(
        executor.requests.lock()[0].operations,
        BTreeSet::from([StackOperation::Backup, StackOperation::Update])
    );
    assert!(fs::read_to_string(&env_file).unwrap().contains("WEB_TAG=2024.1\n"));
}

#[tokio::test]
async fn test_unrecognized_args_fall_back_to_update() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::new(&env_file));
    let runner = runner(&env_file, executor.clone());

    let deployment = alpha().with_args(vec!["alpha".into(), "redeploy".into()]);
    runner.deploy("alpha", &deployment, "v2").await.unwrap();

    assert_eq!(
        executor.requests.lock()[0].operations,
        BTreeSet::from([StackOperation::Update])
    );
}

// ============================================================================
// Rollback
// ============================================================================

#[tokio::test]
async fn test_failed_deploy_restores_exact_content() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::failing(&env_file));
    let runner = runner(&env_file, executor.clone());

    let err = runner.deploy("alpha", &alpha(), "v2").await.unwrap_err();

    let DeployError::Failed(failure) = err else {
        panic!("expected a Failed deployment");
    };
    assert_eq!(failure.message, "deployment failed for stack=alpha");
    assert_eq!(failure.cause, "docker exited with exit code 1");
    assert_eq!(failure.stdout, "partial\n");
    assert_eq!(failure.stderr, "pull failed\n");
    assert_eq!(failure.rollback, RollbackOutcome::Restored);

    assert_eq!(fs::read_to_string(&env_file).unwrap(), ENV);
    assert!(executor.seen_env.lock()[0].contains("ALPHA_IMAGE_TAG=v2"));
}

#[tokio::test]
async fn test_failed_deploy_removes_created_env_file() {
    let (_dir, env_file) = env_dir(None);
    let runner = runner(&env_file, Arc::new(FakeExecutor::failing(&env_file)));

    let err = runner.deploy("alpha", &alpha(), "v2").await.unwrap_err();

    assert!(matches!(err, DeployError::Failed(ref f) if f.rollback.is_restored()));
    assert!(!env_file.exists());
}

#[tokio::test]
async fn test_failed_restore_is_reported_not_raised() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let runner = DeployRunner::new(
        &env_file,
        Arc::new(BrokenRestoreStore(FileEnvStore::new())),
        Arc::new(FakeExecutor::failing(&env_file)),
    );

    let err = runner.deploy("alpha", &alpha(), "v2").await.unwrap_err();

    let DeployError::Failed(failure) = err else {
        panic!("expected a Failed deployment");
    };
    // The original failure is kept; the rollback error rides along.
    assert_eq!(failure.cause, "docker exited with exit code 1");
    match failure.rollback {
        RollbackOutcome::Failed(reason) => assert!(reason.contains("disk full")),
        RollbackOutcome::Restored => panic!("rollback should have failed"),
    }
    assert!(fs::read_to_string(&env_file).unwrap().contains("ALPHA_IMAGE_TAG=v2"));
}

#[tokio::test]
async fn test_timeout_rolls_back() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::slow(&env_file, Duration::from_secs(5)));
    let runner = runner(&env_file, executor).with_command_timeout(Duration::from_millis(50));

    let err = runner.deploy("alpha", &alpha(), "v2").await.unwrap_err();

    let DeployError::Failed(failure) = err else {
        panic!("expected a Failed deployment");
    };
    assert_eq!(failure.cause, "timed out after 0s");
    // Output written before the timeout is kept.
    assert_eq!(failure.stdout, "pulling\n");
    assert!(failure.rollback.is_restored());
    assert_eq!(fs::read_to_string(&env_file).unwrap(), ENV);
}

// ============================================================================
// Validation and ordering
// ============================================================================

#[tokio::test]
async fn test_invalid_tag_touches_nothing() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::new(&env_file));
    let runner = runner(&env_file, executor.clone());

    for tag in ["", "v2 beta", "v2#x", "v2\n"] {
        let err = runner.deploy("alpha", &alpha(), tag).await.unwrap_err();
        assert!(err.is_client_error(), "{tag:?}");
    }

    assert_eq!(fs::read_to_string(&env_file).unwrap(), ENV);
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_invalid_tag_env_fails_before_execution() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::new(&env_file));
    let runner = runner(&env_file, executor.clone());

    let deployment = alpha().with_tag_env("BAD KEY");
    let err = runner.deploy("alpha", &deployment, "v2").await.unwrap_err();

    assert!(matches!(err, DeployError::UpdateEnv(EnvStoreError::InvalidKey(_))));
    assert_eq!(executor.calls(), 0);
    assert_eq!(fs::read_to_string(&env_file).unwrap(), ENV);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deployments_are_serialized() {
    let (_dir, env_file) = env_dir(Some(ENV));
    let executor = Arc::new(FakeExecutor::slow(&env_file, Duration::from_millis(100)));
    let runner = Arc::new(runner(&env_file, executor.clone()));

    let alpha = alpha();
    let web = StackDeployment::for_stack("web");
    let (a, b) = tokio::join!(
        runner.deploy("alpha", &alpha, "v2"),
        runner.deploy("web", &web, "v9"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(executor.calls(), 2);
    assert_eq!(executor.max_active.load(Ordering::SeqCst), 1);

    // The second deployment started from the first one's committed tag.
    let seen = executor.seen_env.lock().clone();
    let has_both = |env: &str| env.contains("ALPHA_IMAGE_TAG=v2\n") && env.contains("WEB_IMAGE_TAG=v9\n");
    assert!(!has_both(&seen[0]));
    assert!(seen[0].contains("ALPHA_IMAGE_TAG=v2\n") || seen[0].contains("WEB_IMAGE_TAG=v9\n"));
    assert!(has_both(&seen[1]));

    let content = fs::read_to_string(&env_file).unwrap();
    assert!(content.contains("ALPHA_IMAGE_TAG=v2\n"));
    assert!(content.contains("WEB_IMAGE_TAG=v9\n"));
}
