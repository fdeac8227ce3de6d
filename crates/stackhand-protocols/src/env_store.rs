//! Env store protocol definitions.
//!
//! An env store edits `KEY=value` lines of a file. The deployment runner
//! uses snapshot/restore around every tag update to implement rollback.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::EnvStoreError;

/// Core trait for env stores.
pub trait EnvStore: Send + Sync {
    /// Read the whole file. A missing file reads as empty.
    fn read(&self, path: &Path) -> Result<String, EnvStoreError>;

    /// Capture the file's current content.
    fn snapshot(&self, path: &Path) -> Result<EnvSnapshot, EnvStoreError>;

    /// Set `key` to `value`, creating the line if absent.
    ///
    /// Returns the previous value, or an empty string if the key was not set.
    fn update(&self, path: &Path, key: &str, value: &str) -> Result<String, EnvStoreError>;

    /// Put the file back exactly as it was when `snapshot` was taken.
    fn restore(&self, path: &Path, snapshot: &EnvSnapshot) -> Result<(), EnvStoreError>;
}

/// Immutable point-in-time capture of an env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    content: Option<Arc<str>>,
    taken_at: DateTime<Utc>,
}

impl EnvSnapshot {
    /// Snapshot of a file with the given content.
    pub fn present(content: impl Into<Arc<str>>) -> Self {
        Self {
            content: Some(content.into()),
            taken_at: Utc::now(),
        }
    }

    /// Snapshot of a file that did not exist.
    pub fn absent() -> Self {
        Self {
            content: None,
            taken_at: Utc::now(),
        }
    }

    /// Captured content, `None` if the file did not exist.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}
