//! File-backed env store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use stackhand_protocols::{EnvSnapshot, EnvStore, EnvStoreError};

use crate::parse::{is_valid_key, split_assignment, strip_export, unquote};

/// Env store over a plain `.env` file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEnvStore;

impl FileEnvStore {
    pub fn new() -> Self {
        Self
    }
}

impl EnvStore for FileEnvStore {
    fn read(&self, path: &Path) -> Result<String, EnvStoreError> {
        Ok(read_optional(path)?.unwrap_or_default())
    }

    fn snapshot(&self, path: &Path) -> Result<EnvSnapshot, EnvStoreError> {
        Ok(match read_optional(path)? {
            Some(content) => EnvSnapshot::present(content),
            None => EnvSnapshot::absent(),
        })
    }

    fn update(&self, path: &Path, key: &str, value: &str) -> Result<String, EnvStoreError> {
        if !is_valid_key(key) {
            return Err(EnvStoreError::InvalidKey(key.to_string()));
        }
        if value.contains(['\n', '\r', '\0']) {
            return Err(EnvStoreError::InvalidValue {
                key: key.to_string(),
                reason: "value must be a single line".to_string(),
            });
        }

        let content = self.read(path)?;
        let (updated, previous) = replace_or_append(&content, key, value);
        write_atomic(path, &updated)?;
        debug!(path = %path.display(), key = %key, "Env file updated");
        Ok(previous)
    }

    fn restore(&self, path: &Path, snapshot: &EnvSnapshot) -> Result<(), EnvStoreError> {
        match snapshot.content() {
            Some(content) => write_atomic(path, content),
            None => match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(EnvStoreError::Write {
                    path: path.to_path_buf(),
                    source,
                }),
            },
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, EnvStoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(EnvStoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace the first assignment of `key`, or append one.
///
/// Returns the new content and the previous value (empty if unset).
fn replace_or_append(content: &str, key: &str, value: &str) -> (String, String) {
    let mut out = String::with_capacity(content.len() + key.len() + value.len() + 2);
    let mut previous = None;

    for line in content.split_inclusive('\n') {
        if previous.is_none() {
            let body = line.trim_end_matches(['\n', '\r']);
            let trimmed = body.trim_start();
            if !trimmed.starts_with('#') {
                if let Some((found, raw)) = split_assignment(trimmed) {
                    if found == key {
                        previous = Some(unquote(raw).to_string());
                        let indent = &body[..body.len() - trimmed.len()];
                        let export = if strip_export(trimmed).len() != trimmed.len() {
                            "export "
                        } else {
                            ""
                        };
                        out.push_str(indent);
                        out.push_str(export);
                        out.push_str(key);
                        out.push('=');
                        out.push_str(value);
                        out.push_str(&line[body.len()..]);
                        continue;
                    }
                }
            }
        }
        out.push_str(line);
    }

    match previous {
        Some(previous) => (out, previous),
        None => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
            (out, String::new())
        }
    }
}

/// Write through a sibling temp file and rename it into place.
///
/// A symlinked path is written at its target, and an existing file keeps
/// its permissions.
fn write_atomic(path: &Path, content: &str) -> Result<(), EnvStoreError> {
    let write_err = |source| EnvStoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == ErrorKind::NotFound => path.to_path_buf(),
        Err(source) => return Err(write_err(source)),
    };
    let permissions = match fs::metadata(&target) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(source) => return Err(write_err(source)),
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = temp_path(&target);
    let staged = fs::write(&tmp, content).and_then(|()| match permissions {
        Some(permissions) => fs::set_permissions(&tmp, permissions),
        None => Ok(()),
    });
    if let Err(source) = staged.and_then(|()| fs::rename(&tmp, &target)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "env".to_string());
    path.with_file_name(format!(".{}.stackhand-tmp", name))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
