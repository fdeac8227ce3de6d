//! Stack executor errors.

use thiserror::Error;

use super::EnvStoreError;
use crate::executor::ExecOutput;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Unknown stack: {0}")]
    UnknownStack(String),

    #[error("No stacks selected")]
    NoStacks,

    #[error("vars-only requires a command after --")]
    MissingCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", exit_label(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: ExecOutput,
    },

    #[error("Env store error: {0}")]
    Env(#[from] EnvStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Output captured before the failure, if any.
    pub fn output(&self) -> Option<&ExecOutput> {
        match self {
            ExecError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
