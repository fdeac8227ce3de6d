//! Stack executor protocol definitions.
//!
//! A stack executor performs stack-level actions (pull and restart,
//! tear down, back up, run a command with the stack's variables loaded)
//! against resolved stack directories.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Core trait for stack executors.
#[async_trait]
pub trait StackExecutor: Send + Sync {
    /// Execute the request, returning whatever output was captured.
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutput, ExecError>;
}

/// A single stack-level operation.
///
/// Variants are declared in execution order; iterating a
/// `BTreeSet<StackOperation>` yields them in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackOperation {
    /// Append variables referenced by the compose file but missing from the env file.
    GetVars,
    /// `docker compose down`.
    TearDown,
    /// Archive the stack directory into the backup directory.
    Backup,
    /// Pull images and recreate containers.
    Update,
    /// Run a literal command with the stack's variables loaded.
    VarsOnly,
}

impl StackOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackOperation::GetVars => "get-vars",
            StackOperation::TearDown => "tear-down",
            StackOperation::Backup => "backup",
            StackOperation::Update => "update",
            StackOperation::VarsOnly => "vars-only",
        }
    }
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get-vars" => Ok(StackOperation::GetVars),
            "tear-down" => Ok(StackOperation::TearDown),
            "backup" => Ok(StackOperation::Backup),
            "update" => Ok(StackOperation::Update),
            "vars-only" => Ok(StackOperation::VarsOnly),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// Which stacks a request applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackTarget {
    /// Every stack directory that holds a compose file.
    All,
    /// The named stacks, in order.
    Stacks(Vec<String>),
}

/// Where child process output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout/stderr into the returned [`ExecOutput`].
    #[default]
    Capture,
    /// Forward to the parent process streams.
    Inherit,
}

/// A request to a [`StackExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub target: StackTarget,
    pub operations: BTreeSet<StackOperation>,
    /// Literal command tokens for [`StackOperation::VarsOnly`].
    pub command: Vec<String>,
    pub output: OutputMode,
    /// Receives captured output as it is produced, so a caller that
    /// abandons the execution still sees what was written.
    pub sink: Option<OutputSink>,
}

impl ExecRequest {
    /// Request against a single stack.
    pub fn for_stack(stack: impl Into<String>) -> Self {
        Self {
            target: StackTarget::Stacks(vec![stack.into()]),
            operations: BTreeSet::new(),
            command: Vec::new(),
            output: OutputMode::Capture,
            sink: None,
        }
    }

    /// Request against every stack.
    pub fn all_stacks() -> Self {
        Self {
            target: StackTarget::All,
            ..Self::for_stack(String::new())
        }
    }

    pub fn with_operation(mut self, operation: StackOperation) -> Self {
        self.operations.insert(operation);
        self
    }

    pub fn with_operations(mut self, operations: impl IntoIterator<Item = StackOperation>) -> Self {
        self.operations.extend(operations);
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build a request from command-line style tokens.
    ///
    /// `all` selects every stack, operation names select operations and
    /// anything else is a stack name. Tokens after `--` form the command
    /// and imply `vars-only`.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut all = false;
        let mut stacks = Vec::new();
        let mut operations = BTreeSet::new();
        let mut command = Vec::new();

        let tokens: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            if token == "--" {
                operations.insert(StackOperation::VarsOnly);
                command = iter.by_ref().map(str::to_string).collect();
                break;
            }
            if token == "all" {
                all = true;
                continue;
            }
            match token.parse::<StackOperation>() {
                Ok(op) => {
                    operations.insert(op);
                }
                Err(_) => stacks.push(token.to_string()),
            }
        }

        Self {
            target: if all {
                StackTarget::All
            } else {
                StackTarget::Stacks(stacks)
            },
            operations,
            command,
            output: OutputMode::Capture,
            sink: None,
        }
    }
}

/// Output captured from an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Append another step's output.
    pub fn append(&mut self, other: &ExecOutput) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Shared, incrementally filled [`ExecOutput`].
///
/// Clones write to the same buffer. Two sinks compare equal only when
/// they share it.
#[derive(Debug, Clone, Default)]
pub struct OutputSink(Arc<Mutex<ExecOutput>>);

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stdout(&self, text: &str) {
        self.0.lock().stdout.push_str(text);
    }

    pub fn push_stderr(&self, text: &str) {
        self.0.lock().stderr.push_str(text);
    }

    /// Copy of everything written so far.
    pub fn snapshot(&self) -> ExecOutput {
        self.0.lock().clone()
    }
}

impl PartialEq for OutputSink {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for OutputSink {}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
