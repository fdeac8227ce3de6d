//! Deployment outcomes.

use std::fmt;

use serde::Serialize;

/// A successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    /// Always `"ok"`.
    pub status: &'static str,
    pub stack: String,
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
}

impl DeployResult {
    pub fn ok(stack: impl Into<String>, tag: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            status: "ok",
            stack: stack.into(),
            tag: tag.into(),
            stdout: stdout.into(),
        }
    }
}

/// What happened to the env file after a failed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// The env file is back to its pre-deployment content.
    Restored,
    /// Restoring failed; the env file may still carry the new tag.
    Failed(String),
}

impl RollbackOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, RollbackOutcome::Restored)
    }
}

/// A deployment whose stack operations failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployFailure {
    /// `deployment failed for stack=<stack>`.
    pub message: String,
    /// The executor error or timeout that triggered the rollback.
    pub cause: String,
    pub stdout: String,
    pub stderr: String,
    pub rollback: RollbackOutcome,
}

impl fmt::Display for DeployFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
