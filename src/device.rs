//! Special file creation
//!
//! Recreates device nodes, named pipes, and socket inodes from captured
//! metadata using `mknod(2)`. The final mode is composed from the captured
//! permission bits and the type bits for the requested kind; the device
//! number is passed through unchanged (the OS ignores it for fifos and
//! sockets).
//!
//! Creating device nodes requires privilege (`CAP_MKNOD` on Linux); fifo
//! and socket inodes can be created by any user.

use std::path::Path;

use nix::sys::stat::{self, Mode, SFlag};

use crate::error::{invalid_kind, os_error, Result};
use crate::metadata::FileKind;

/// Recreate a special file at `path` from captured metadata
///
/// `kind` must be one of [`FileKind::BlockDevice`], [`FileKind::CharDevice`],
/// [`FileKind::Fifo`], or [`FileKind::Socket`]; any other kind fails before
/// any syscall is attempted. `permissions` are the captured permission bits
/// (including setuid/setgid/sticky); `rdev` is the captured device number,
/// ignored by the OS for fifos and sockets but passed regardless.
///
/// # Errors
///
/// - [`CaptureError::InvalidKind`](crate::CaptureError::InvalidKind) if
///   `kind` is not a special-file kind (no filesystem mutation occurs)
/// - [`CaptureError::Os`](crate::CaptureError::Os) with `syscall = "mknod"`
///   if the node cannot be created (path exists, permission denied,
///   unsupported filesystem)
pub fn create_special(path: &Path, kind: FileKind, permissions: u32, rdev: u64) -> Result<()> {
    let type_bits = match kind {
        FileKind::BlockDevice => SFlag::S_IFBLK,
        FileKind::CharDevice => SFlag::S_IFCHR,
        FileKind::Fifo => SFlag::S_IFIFO,
        FileKind::Socket => SFlag::S_IFSOCK,
        other => {
            return Err(invalid_kind(format!(
                "{} is not a special-file kind",
                other.code()
            )))
        }
    };

    // mode_t is u16 on macOS, u32 on Linux - cast to the platform's type
    let perm = Mode::from_bits_truncate(permissions as nix::libc::mode_t);

    stat::mknod(path, type_bits, perm, rdev as nix::libc::dev_t)
        .map_err(|errno| os_error("mknod", path, errno))
}

/// Recreate a special file from a serialized kind code
///
/// Restore-path entry point: accepts the wire code (`BLK`, `CHR`, `FIFO`,
/// `SOCK`) as read back from an archive.
///
/// # Errors
///
/// Same as [`create_special`]; an unknown code fails with
/// [`CaptureError::InvalidKind`](crate::CaptureError::InvalidKind) before
/// any filesystem mutation.
pub fn create_special_from_code(path: &Path, code: &str, permissions: u32, rdev: u64) -> Result<()> {
    create_special(path, code.parse()?, permissions, rdev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_non_special_kinds_before_touching_the_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        for kind in [FileKind::Regular, FileKind::Directory, FileKind::Symlink] {
            let path = temp_dir.path().join(kind.code());
            let err = create_special(&path, kind, 0o644, 0).unwrap_err();
            assert!(matches!(err, crate::CaptureError::InvalidKind(_)));
            assert!(!path.exists(), "{kind} must not create anything");
        }
    }

    #[test]
    fn rejects_unknown_kind_codes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("node");
        let err = create_special_from_code(&path, "REG", 0o644, 0).unwrap_err();
        assert!(matches!(err, crate::CaptureError::InvalidKind(_)));
        let err = create_special_from_code(&path, "WHT", 0o644, 0).unwrap_err();
        assert!(matches!(err, crate::CaptureError::InvalidKind(_)));
        assert!(!path.exists());
    }

    #[test]
    fn creates_a_fifo() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipe");
        create_special(&path, FileKind::Fifo, 0o640, 0).unwrap();

        let meta = crate::capture(&path).unwrap();
        assert_eq!(meta.kind, FileKind::Fifo);
        assert_eq!(meta.permissions, 0o640);
        assert_eq!(meta.rdev, None);
    }

    #[test]
    fn fails_with_mknod_error_when_path_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipe");
        create_special(&path, FileKind::Fifo, 0o644, 0).unwrap();

        let err = create_special(&path, FileKind::Fifo, 0o644, 0).unwrap_err();
        match err {
            crate::CaptureError::Os { syscall, errno, .. } => {
                assert_eq!(syscall, "mknod");
                assert_eq!(errno, nix::errno::Errno::EEXIST);
            }
            other => panic!("expected mknod failure, got {other}"),
        }
    }
}
