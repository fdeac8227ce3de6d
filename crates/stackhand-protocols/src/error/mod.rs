//! Error types for the collaborator contracts.

mod env;
mod exec;

pub use env::*;
pub use exec::*;
