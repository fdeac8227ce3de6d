//! # StackHand Deploy
//!
//! Tag-based deployments with automatic rollback.
//!
//! A deployment writes the new image tag into the shared env file, runs
//! the stack's configured operations through a
//! [`StackExecutor`](stackhand_protocols::StackExecutor), and restores the
//! env file byte-for-byte if the execution fails or times out.
//!
//! Deployments are serialized across all stacks: the env file is shared.

mod error;
mod result;
mod runner;
mod tag;

pub use error::DeployError;
pub use result::{DeployFailure, DeployResult, RollbackOutcome};
pub use runner::{DeployRunner, DEFAULT_COMMAND_TIMEOUT};
pub use tag::validate_tag;
