//! Path canonicalization

use std::path::{Path, PathBuf};

use crate::error::{errno_of, os_error, Result};

/// Resolve `path` to its canonical absolute form
///
/// All symlinks and `.`/`..` components are resolved (realpath semantics).
///
/// # Errors
///
/// Returns [`CaptureError::Os`](crate::CaptureError::Os) with
/// `syscall = "realpath"` if any component is missing or resolution
/// otherwise fails (cycle, permission).
pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|err| os_error("realpath", path, errno_of(&err)))
}
