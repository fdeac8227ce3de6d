//! # StackHand Protocols
//!
//! Interfaces shared by the StackHand crates. Contains the collaborator
//! traits the scheduler and deployment runner are written against, plus
//! the plain data types that cross crate boundaries.
//!
//! ## Core Traits
//!
//! - [`StackExecutor`] - Runs stack-level operations (update, tear-down, ...)
//! - [`EnvStore`] - Line-level read / snapshot / update / restore of an env file

pub mod deployment;
pub mod env_store;
pub mod environment;
pub mod error;
pub mod executor;

pub use deployment::{default_tag_env, StackDeployment};
pub use env_store::{EnvSnapshot, EnvStore};
pub use environment::StackEnvironment;
pub use error::{EnvStoreError, ExecError};
pub use executor::{
    ExecOutput, ExecRequest, OutputMode, OutputSink, StackExecutor, StackOperation, StackTarget,
};
