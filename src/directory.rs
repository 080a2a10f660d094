//! Lazy directory enumeration
//!
//! Wraps an open directory stream and yields entries one at a time in OS
//! order, carrying each entry's inode number so callers can detect hard
//! links without an extra stat call. The sequence is single-pass and
//! non-restartable; exhaustion is signaled by `Ok(None)`, not an error.
//!
//! `.` and `..` are reported as the OS reports them — filtering is the
//! caller's decision.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::dir::Dir;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::error::{os_error, Result};

/// One directory entry: its name and inode number
///
/// Produced transiently by enumeration; the reader does not retain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Entry name (basename only, as reported by the OS)
    pub name: OsString,
    /// Inode number, shared by all hard links to the same object
    pub ino: u64,
}

/// A lazy, single-pass reader over one directory's entries
///
/// The underlying descriptor is exclusively owned by this reader and is
/// released when the reader is dropped or explicitly [`close`](Self::close)d,
/// on every exit path. A closed reader cannot be read again — the handle is
/// consumed — so use-after-close is unrepresentable.
#[derive(Debug)]
pub struct DirReader {
    iter: nix::dir::OwningIter,
    path: PathBuf,
    done: bool,
}

impl DirReader {
    /// Open a directory for enumeration
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Os`](crate::CaptureError::Os) with
    /// `syscall = "opendir"` if the path is missing, not a directory, or
    /// unreadable.
    pub fn open(path: &Path) -> Result<Self> {
        let dir = Dir::open(
            path,
            OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .map_err(|errno| os_error("opendir", path, errno))?;

        Ok(Self {
            iter: dir.into_iter(),
            path: path.to_path_buf(),
            done: false,
        })
    }

    /// The path this reader enumerates (for error messages and logging)
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Yield the next entry, or `Ok(None)` once the sequence is exhausted
    ///
    /// Entries come back in OS-defined order, unsorted, with `.` and `..`
    /// included. The reader is fused: after returning `None` it never
    /// yields an entry again.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Os`](crate::CaptureError::Os) with
    /// `syscall = "readdir"` if the OS reports a failure mid-stream (e.g.
    /// `EBADF` on a descriptor invalidated behind our back).
    pub fn next_entry(&mut self) -> Result<Option<DirectoryEntry>> {
        if self.done {
            return Ok(None);
        }
        match self.iter.next() {
            None => {
                self.done = true;
                Ok(None)
            }
            Some(Ok(entry)) => Ok(Some(DirectoryEntry {
                name: OsStr::from_bytes(entry.file_name().to_bytes()).to_os_string(),
                ino: entry.ino(),
            })),
            Some(Err(errno)) => Err(os_error("readdir", &self.path, errno)),
        }
    }

    /// Release the directory handle
    ///
    /// Dropping the reader has the same effect; this form makes the release
    /// point explicit at call sites that want it.
    pub fn close(self) {
        drop(self);
    }
}
