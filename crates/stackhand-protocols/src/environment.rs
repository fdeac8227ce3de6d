//! Extra variables handed to every child process of a stack.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Variables and paths a stack's commands run with, on top of the env file.
///
/// - `global` applies to every stack, `stacks[<name>]` to one stack and
///   wins over `global`.
/// - Each storage pool becomes `STACK_STORAGE_<POOL>=<pool dir>/<stack>`.
/// - Each custom path becomes `STACK_PATH_<NAME>=<path>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackEnvironment {
    pub global: BTreeMap<String, String>,
    pub stacks: BTreeMap<String, BTreeMap<String, String>>,
    pub pools: BTreeMap<String, PathBuf>,
    pub custom_paths: BTreeMap<String, PathBuf>,
}

impl StackEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global.insert(key.into(), value.into());
        self
    }

    pub fn with_stack_var(
        mut self,
        stack: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.stacks
            .entry(stack.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn with_pool(mut self, name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.pools.insert(name.into(), dir.into());
        self
    }

    pub fn with_custom_path(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.custom_paths.insert(name.into(), path.into());
        self
    }

    /// Configured variables for `stack`, global first then stack-specific.
    pub fn vars_for(&self, stack: &str) -> Vec<(String, String)> {
        let mut merged = self.global.clone();
        if let Some(overrides) = self.stacks.get(stack) {
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged.into_iter().collect()
    }

    /// `STACK_STORAGE_*` and `STACK_PATH_*` for `stack`.
    pub fn paths_for(&self, stack: &str) -> Vec<(String, String)> {
        let storage = self.pools.iter().map(|(name, dir)| {
            (
                format!("STACK_STORAGE_{}", env_suffix(name)),
                dir.join(stack).display().to_string(),
            )
        });
        let custom = self.custom_paths.iter().map(|(name, path)| {
            (
                format!("STACK_PATH_{}", env_suffix(name)),
                path.display().to_string(),
            )
        });
        storage.chain(custom).collect()
    }
}

/// Upper-case `name` with `-`, `.` and spaces turned into `_`.
fn env_suffix(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .chars()
        .map(|c| if matches!(c, '-' | '.' | ' ') { '_' } else { c })
        .collect()
}
