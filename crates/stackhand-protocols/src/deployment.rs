//! Per-stack deployment metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::executor::StackOperation;

/// How a stack is deployed: which variable carries its image tag and
/// which operations a deployment runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDeployment {
    pub tag_env: String,
    pub args: Vec<String>,
}

impl StackDeployment {
    /// Deployment metadata with the default tag variable and an update.
    pub fn for_stack(stack: &str) -> Self {
        Self {
            tag_env: default_tag_env(stack),
            args: vec!["update".to_string()],
        }
    }

    pub fn with_tag_env(mut self, tag_env: impl Into<String>) -> Self {
        self.tag_env = tag_env.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Operations named in `args`.
    ///
    /// Unrecognized tokens (including stack names) are ignored.
    pub fn operations(&self) -> BTreeSet<StackOperation> {
        self.args
            .iter()
            .filter_map(|arg| arg.trim().parse().ok())
            .collect()
    }
}

/// `<STACK>_IMAGE_TAG`, upper-cased with `-` and spaces turned into `_`.
pub fn default_tag_env(stack: &str) -> String {
    let sanitized: String = stack
        .to_uppercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect();
    format!("{}_IMAGE_TAG", sanitized)
}
