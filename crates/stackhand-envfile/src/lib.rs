//! # StackHand Env File
//!
//! [`FileEnvStore`] edits `KEY=value` lines of a `.env` file in place,
//! leaving comments and unrelated lines untouched. Every write goes to a
//! temporary sibling file which is then renamed over the original.

mod parse;
mod store;

pub use parse::{is_valid_key, parse};
pub use store::FileEnvStore;
