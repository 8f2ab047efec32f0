//! Staging path validation.
//!
//! Executable names come from a remote catalog, so the staged file must be
//! kept inside the games directory. `..` traversal and absolute paths are
//! rejected; `\` is treated as a separator so Windows-style sub-paths work
//! on every platform.

use std::path::{Component, Path, PathBuf};

use crate::{AppError, Result};

/// Resolve `relative` under `root`, refusing anything that escapes it.
///
/// `root` must exist. Returns the absolute target path.
///
/// # Errors
///
/// Returns `AppError::PathViolation` if:
/// - The root cannot be canonicalized.
/// - The candidate is absolute or empty.
/// - The candidate contains `..` segments that escape the root.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .map_err(|err| AppError::PathViolation(format!("games directory invalid: {err}")))?;

    let unified = relative.replace('\\', "/");
    let mut normalized = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(AppError::PathViolation(format!(
                        "'{relative}' escapes the games directory"
                    )));
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::PathViolation(format!(
                    "'{relative}' must be a relative path"
                )));
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(AppError::PathViolation("empty path".into()));
    }

    Ok(root.join(normalized))
}
