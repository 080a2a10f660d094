//! Access-time preserving file open
//!
//! A backup scanner that reads every file on the system would otherwise
//! rewrite every access time it touches. On Linux, `O_NOATIME` suppresses
//! the update — but the kernel only permits it on files the caller owns
//! (or with `CAP_FOWNER`), rejecting the open with `EPERM` otherwise.

use std::fs::File;
use std::os::unix::io::FromRawFd;
use std::path::Path;

#[cfg(target_os = "linux")]
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
#[cfg(target_os = "linux")]
use tracing::debug;

use crate::error::{os_error, Result};

/// Open a file read-only without disturbing its access time where possible
///
/// Attempts `open(O_RDONLY | O_NOATIME)` first. If the kernel rejects that
/// with `EPERM` — the caller may not suppress atime updates on a file it
/// does not own — falls back exactly once to a plain read-only open. This
/// is a policy fallback, the crate's only built-in retry; every other
/// failure (missing file, `EACCES`, `EMFILE`, a failing fallback) surfaces
/// immediately.
///
/// # Errors
///
/// Returns [`CaptureError::Os`](crate::CaptureError::Os) with
/// `syscall = "open"` on failure.
#[cfg(target_os = "linux")]
pub fn open_for_read(path: &Path) -> Result<File> {
    let flags = OFlag::O_RDONLY | OFlag::O_CLOEXEC;
    let fd = match fcntl::open(path, flags | OFlag::O_NOATIME, Mode::empty()) {
        Ok(fd) => fd,
        Err(Errno::EPERM) => {
            debug!(path = %path.display(), "O_NOATIME rejected, retrying plain open");
            fcntl::open(path, flags, Mode::empty())
                .map_err(|errno| os_error("open", path, errno))?
        }
        Err(errno) => return Err(os_error("open", path, errno)),
    };

    // SAFETY: fd was just returned by open(2) and is owned by nobody else;
    // File takes sole ownership and closes it on drop.
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Open a file read-only (non-Linux Unix)
///
/// `O_NOATIME` is Linux-only; elsewhere this is a plain read-only open.
///
/// # Errors
///
/// Returns [`CaptureError::Os`](crate::CaptureError::Os) with
/// `syscall = "open"` on failure.
#[cfg(all(unix, not(target_os = "linux")))]
pub fn open_for_read(path: &Path) -> Result<File> {
    let fd = fcntl::open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty())
        .map_err(|errno| os_error("open", path, errno))?;

    // SAFETY: fd was just returned by open(2) and is owned by nobody else;
    // File takes sole ownership and closes it on drop.
    Ok(unsafe { File::from_raw_fd(fd) })
}
