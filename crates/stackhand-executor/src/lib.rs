//! # StackHand Executor
//!
//! [`ComposeExecutor`] implements [`StackExecutor`](stackhand_protocols::StackExecutor)
//! by driving the `docker compose` CLI against stack directories.
//!
//! ## Operations
//!
//! Per stack, in this order:
//!
//! - `get-vars` - append variables the compose file references but the env file lacks
//! - `tear-down` - `docker compose down`
//! - `backup` - archive the stack directory with `tar`
//! - `update` - `docker compose pull` then `up -d --remove-orphans`
//! - `vars-only` - run a literal command with the stack's variables loaded

mod command;
mod compose;
mod stacks;
mod vars;

pub use compose::{ComposeExecutor, ComposeExecutorConfig};
pub use stacks::is_valid_stack_name;
pub use vars::referenced_vars;
