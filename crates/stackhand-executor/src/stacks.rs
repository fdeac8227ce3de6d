//! Stack directory resolution.

use std::path::{Path, PathBuf};

use stackhand_protocols::{ExecError, StackTarget};

/// A stack resolved to its directory and compose file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedStack {
    pub name: String,
    pub dir: PathBuf,
    pub compose_file: PathBuf,
}

/// Whether `name` is a plain directory name.
pub fn is_valid_stack_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Resolve a target against `stacks_dir`.
///
/// `All` yields every subdirectory holding `compose_file`, sorted by name.
/// Named stacks keep their given order and must exist.
pub(crate) fn resolve(
    stacks_dir: &Path,
    compose_file: &str,
    target: &StackTarget,
) -> Result<Vec<ResolvedStack>, ExecError> {
    let stacks = match target {
        StackTarget::All => {
            let mut stacks = Vec::new();
            for entry in std::fs::read_dir(stacks_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let dir = entry.path();
                let compose = dir.join(compose_file);
                if compose.is_file() {
                    stacks.push(ResolvedStack {
                        name,
                        dir,
                        compose_file: compose,
                    });
                }
            }
            stacks.sort_by(|a, b| a.name.cmp(&b.name));
            stacks
        }
        StackTarget::Stacks(names) => names
            .iter()
            .map(|name| {
                if !is_valid_stack_name(name) {
                    return Err(ExecError::UnknownStack(name.clone()));
                }
                let dir = stacks_dir.join(name);
                let compose = dir.join(compose_file);
                if !compose.is_file() {
                    return Err(ExecError::UnknownStack(name.clone()));
                }
                Ok(ResolvedStack {
                    name: name.clone(),
                    dir,
                    compose_file: compose,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    if stacks.is_empty() {
        return Err(ExecError::NoStacks);
    }
    Ok(stacks)
}
