//! Deployment runner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use stackhand_protocols::{
    EnvSnapshot, EnvStore, ExecRequest, OutputSink, StackDeployment, StackExecutor, StackOperation,
};

use crate::error::DeployError;
use crate::result::{DeployFailure, DeployResult, RollbackOutcome};
use crate::tag::validate_tag;

/// Default ceiling for the stack operations of one deployment.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Runs deployments against a shared env file.
///
/// Every call to [`deploy`](Self::deploy) holds one lock from snapshot to
/// commit or rollback, so deployments never interleave.
pub struct DeployRunner {
    env_file: PathBuf,
    env_store: Arc<dyn EnvStore>,
    executor: Arc<dyn StackExecutor>,
    command_timeout: Duration,
    lock: Mutex<()>,
}

impl DeployRunner {
    pub fn new(
        env_file: impl Into<PathBuf>,
        env_store: Arc<dyn EnvStore>,
        executor: Arc<dyn StackExecutor>,
    ) -> Self {
        Self {
            env_file: env_file.into(),
            env_store,
            executor,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            lock: Mutex::new(()),
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn env_file(&self) -> &PathBuf {
        &self.env_file
    }

    /// Deploy `tag` to `stack`.
    ///
    /// On success the tag variable holds `tag`. On [`DeployError::Failed`]
    /// the env file has been restored to its pre-call content, unless the
    /// failure's rollback outcome says otherwise.
    pub async fn deploy(
        &self,
        stack: &str,
        deployment: &StackDeployment,
        tag: &str,
    ) -> Result<DeployResult, DeployError> {
        validate_tag(tag)?;

        let _guard = self.lock.lock().await;

        let snapshot = self
            .env_store
            .snapshot(&self.env_file)
            .map_err(DeployError::Snapshot)?;

        let previous = self
            .env_store
            .update(&self.env_file, &deployment.tag_env, tag)
            .map_err(DeployError::UpdateEnv)?;
        info!(
            stack = %stack,
            tag_env = %deployment.tag_env,
            tag = %tag,
            previous = %previous,
            "Updated tag variable"
        );

        let mut operations = deployment.operations();
        if operations.is_empty() {
            operations.insert(StackOperation::Update);
        }
        let sink = OutputSink::new();
        let request = ExecRequest::for_stack(stack)
            .with_operations(operations)
            .with_sink(sink.clone());

        let (cause, output) =
            match tokio::time::timeout(self.command_timeout, self.executor.execute(request)).await {
                Ok(Ok(output)) => {
                    info!(stack = %stack, tag = %tag, "Deployment finished");
                    return Ok(DeployResult::ok(stack, tag, output.stdout.trim()));
                }
                Ok(Err(e)) => (e.to_string(), e.output().cloned().unwrap_or_default()),
                Err(_) => (
                    format!("timed out after {}s", self.command_timeout.as_secs()),
                    sink.snapshot(),
                ),
            };

        warn!(stack = %stack, tag = %tag, error = %cause, "Deployment failed, rolling back");
        let rollback = self.rollback(&deployment.tag_env, &snapshot);

        Err(DeployError::Failed(DeployFailure {
            message: format!("deployment failed for stack={}", stack),
            cause,
            stdout: output.stdout,
            stderr: output.stderr,
            rollback,
        }))
    }

    fn rollback(&self, tag_env: &str, snapshot: &EnvSnapshot) -> RollbackOutcome {
        match self.env_store.restore(&self.env_file, snapshot) {
            Ok(()) => {
                info!(tag_env = %tag_env, "Rolled back to previous value");
                RollbackOutcome::Restored
            }
            Err(e) => {
                error!(tag_env = %tag_env, error = %e, "Failed to roll back env file");
                RollbackOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
