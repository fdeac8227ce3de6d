//! Deployment errors.

use thiserror::Error;

use stackhand_protocols::EnvStoreError;

use crate::result::DeployFailure;

#[derive(Debug, Error)]
pub enum DeployError {
    /// The tag cannot be written as an env value. Nothing was changed.
    #[error("Invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("Failed to read env file: {0}")]
    Snapshot(#[source] EnvStoreError),

    #[error("Failed to update env file: {0}")]
    UpdateEnv(#[source] EnvStoreError),

    /// The stack operations failed after the tag was written.
    #[error("{0}")]
    Failed(DeployFailure),
}

impl DeployError {
    /// Whether the caller supplied bad input, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DeployError::InvalidTag { .. })
    }
}
