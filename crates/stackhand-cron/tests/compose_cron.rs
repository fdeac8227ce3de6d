//! End-to-end tests for the cron scheduler driving the compose executor.
//!
//! The docker CLI is replaced by a shell script that records its
//! arguments, so every job command can be asserted without a daemon.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stackhand_cron::{CronScheduler, JobId, SchedulerOptions, SchedulerStatus};
use stackhand_envfile::FileEnvStore;
use stackhand_executor::{ComposeExecutor, ComposeExecutorConfig};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

struct Fixture {
    _dir: TempDir,
    stacks_dir: PathBuf,
    log: PathBuf,
    docker: PathBuf,
    env_file: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let stacks_dir = dir.path().join("stacks");
        fs::create_dir_all(&stacks_dir).unwrap();

        let log = dir.path().join("docker.log");
        let docker = dir.path().join("fake-docker");
        fs::write(&docker, "#!/bin/sh\necho \"$STACK_NAME $*\" >> \"$LOG\"\n").unwrap();
        fs::set_permissions(&docker, fs::Permissions::from_mode(0o755)).unwrap();

        let env_file = dir.path().join(".env");
        fs::write(&env_file, format!("LOG={}\n", log.display())).unwrap();

        Self {
            _dir: dir,
            stacks_dir,
            log,
            docker,
            env_file,
        }
    }

    fn write_stack(&self, stack: &str, compose: &str) -> PathBuf {
        let dir = self.stacks_dir.join(stack);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docker-compose.yml");
        fs::write(&path, compose).unwrap();
        path
    }

    fn scheduler(&self) -> CronScheduler {
        let docker = self.docker.display().to_string();
        let executor = ComposeExecutor::new(
            ComposeExecutorConfig::new(&self.stacks_dir, &self.env_file).with_docker(&docker),
            Arc::new(FileEnvStore::new()),
        );
        CronScheduler::new(
            &self.stacks_dir,
            Arc::new(executor),
            SchedulerOptions::default()
                .with_docker(docker)
                .with_command_timeout(Duration::from_secs(30)),
        )
    }

    fn logged(&self) -> String {
        fs::read_to_string(&self.log).unwrap_or_default()
    }
}

async fn wait_for_log(log: &Path) -> String {
    for _ in 0..300 {
        if let Ok(content) = fs::read_to_string(log) {
            if !content.is_empty() {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    String::new()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_run_on_deploy_runs_compose_service() {
    let fx = Fixture::new();
    let compose = fx.write_stack(
        "alpha",
        r#"
services:
  app:
    image: nginx
  backup:
    image: busybox
    profiles: ["cron"]
    labels:
      - "stackhand.cron.schedule=0 3 * * *"
      - "stackhand.cron.run_on_deploy=true"
"#,
    );

    let scheduler = fx.scheduler();
    assert_eq!(scheduler.start().await.unwrap(), 1);
    assert_eq!(scheduler.status().await, SchedulerStatus::Running);

    let logged = wait_for_log(&fx.log).await;
    assert_eq!(
        logged.trim(),
        format!("alpha compose --file {} --profile cron run --rm backup", compose.display())
    );

    let stats = scheduler.stats();
    assert_eq!(stats.dispatched, 1);

    scheduler.stop().await;
    assert_eq!(scheduler.status().await, SchedulerStatus::Stopped);
}

#[tokio::test]
async fn test_listing_reflects_compose_labels() {
    let fx = Fixture::new();
    fx.write_stack(
        "beta",
        "services:\n  report:\n    labels:\n      stackhand.cron.schedule: \"@every 10m\"\n",
    );
    fx.write_stack("gamma", "services:\n  web:\n    image: nginx\n");

    let scheduler = fx.scheduler();
    scheduler.start().await.unwrap();

    let jobs = scheduler.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id(), JobId::new("beta", "report"));
    assert_eq!(jobs[0].schedule.as_str(), "@every 10m");
    assert!(jobs[0].next_run().is_some());

    scheduler.stop().await;
    assert!(fx.logged().is_empty());
}
