//! Error types for capture and restore operations
//!
//! Every failing POSIX call is reported through one uniform variant carrying
//! the syscall name, the path it was applied to, and the OS error code, so
//! callers can decide to log, skip, or abort without matching on
//! heterogeneous error types per call site.

use std::path::{Path, PathBuf};

use nix::errno::Errno;
use thiserror::Error;

/// Result type for all fs-capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Errors raised by capture and restore operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A POSIX call failed
    ///
    /// Carries the syscall name, the path the operation was applied to, and
    /// the OS error code.
    #[error("{syscall} failed on {}: {errno}", path.display())]
    Os {
        /// Name of the failing syscall (e.g. `lstat`, `mknod`)
        syscall: &'static str,
        /// Path the operation was applied to
        path: PathBuf,
        /// OS error code
        errno: Errno,
    },

    /// An object's type bits, or a restore request's kind, matched no
    /// recognized file kind
    #[error("invalid file kind: {0}")]
    InvalidKind(String),

    /// A two-phase extended attribute fetch observed a size change between
    /// the probe and the fetch (race with concurrent mutation)
    #[error(
        "attribute size changed on {}: expected {expected} bytes, found {actual}",
        path.display()
    )]
    SizeMismatch {
        /// Path the attribute was read from
        path: PathBuf,
        /// Size reported by the probe
        expected: usize,
        /// Size observed by the fetch
        actual: usize,
    },

    /// A serialized timestamp could not be parsed
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl CaptureError {
    /// The OS error code, if this error came from a failing syscall
    ///
    /// Lets callers implement skip policies (e.g. "skip `ENOENT`, abort on
    /// everything else") without destructuring the variant.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

/// Build a [`CaptureError::Os`] for a failing syscall
pub(crate) fn os_error(syscall: &'static str, path: &Path, errno: Errno) -> CaptureError {
    CaptureError::Os {
        syscall,
        path: path.to_path_buf(),
        errno,
    }
}

/// Build a [`CaptureError::InvalidKind`]
pub(crate) fn invalid_kind(msg: impl Into<String>) -> CaptureError {
    CaptureError::InvalidKind(msg.into())
}

/// Build a [`CaptureError::SizeMismatch`]
pub(crate) fn size_mismatch(path: &Path, expected: usize, actual: usize) -> CaptureError {
    CaptureError::SizeMismatch {
        path: path.to_path_buf(),
        expected,
        actual,
    }
}

/// Map a `std::io::Error` onto the errno it wraps
pub(crate) fn errno_of(err: &std::io::Error) -> Errno {
    err.raw_os_error()
        .map_or(Errno::UnknownErrno, Errno::from_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_error_display_names_syscall_and_path() {
        let err = os_error("lstat", Path::new("/no/such"), Errno::ENOENT);
        let msg = err.to_string();
        assert!(msg.contains("lstat"));
        assert!(msg.contains("/no/such"));
    }

    #[test]
    fn errno_accessor_only_set_for_os_errors() {
        let err = os_error("open", Path::new("/f"), Errno::EACCES);
        assert_eq!(err.errno(), Some(Errno::EACCES));
        assert_eq!(invalid_kind("bogus").errno(), None);
    }
}
