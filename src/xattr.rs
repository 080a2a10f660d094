//! Extended attribute reads
//!
//! Lists and fetches extended attributes without following symlinks, using
//! the `llistxattr(2)`/`lgetxattr(2)` pair. Both operations are inherently
//! two-phase — query the size, then fetch into an exact buffer — and the
//! attribute set can change between the two calls, so both phases are
//! modeled explicitly:
//!
//! - The name list is fetched with a size probe and a bounded re-probe loop
//!   if it grows underneath us (`ERANGE`). A fixed-size buffer would
//!   silently truncate large attribute sets.
//! - A value fetch that observes a size different from its probe fails with
//!   `SizeMismatch`; retrying is the caller's policy.

use std::ffi::{CStr, CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use tracing::trace;

use crate::error::{os_error, size_mismatch, Result};

/// Re-probe attempts before a growing name list is reported as a mismatch
const LIST_SIZE_RETRIES: usize = 3;

fn path_cstring(path: &Path, syscall: &'static str) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| os_error(syscall, path, Errno::EINVAL))
}

/// Split a null-separated name buffer into individual names
fn parse_name_list(buffer: &[u8]) -> Vec<OsString> {
    buffer
        .split(|&b| b == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| OsStr::from_bytes(chunk).to_os_string())
        .collect()
}

fn probe_list_size(cpath: &CStr, path: &Path) -> Result<usize> {
    let size = unsafe { libc::llistxattr(cpath.as_ptr(), std::ptr::null_mut(), 0) };
    if size < 0 {
        return Err(os_error("llistxattr", path, Errno::last()));
    }
    Ok(size as usize)
}

fn probe_value_size(cpath: &CStr, cname: &CStr, path: &Path) -> Result<usize> {
    let size = unsafe {
        libc::lgetxattr(
            cpath.as_ptr(),
            cname.as_ptr(),
            std::ptr::null_mut(),
            0,
        )
    };
    if size < 0 {
        return Err(os_error("lgetxattr", path, Errno::last()));
    }
    Ok(size as usize)
}

/// List the extended attribute names of the object named by `path`
///
/// Non-following: a trailing symlink's own attributes are listed, not its
/// target's. Names come back in OS enumeration order; the OS guarantees
/// they are unique.
///
/// # Errors
///
/// - [`CaptureError::Os`](crate::CaptureError::Os) with
///   `syscall = "llistxattr"` on outright failure (path missing,
///   unsupported filesystem)
/// - [`CaptureError::SizeMismatch`](crate::CaptureError::SizeMismatch) if
///   the list keeps growing through every re-probe attempt
pub fn list_xattrs(path: &Path) -> Result<Vec<OsString>> {
    let cpath = path_cstring(path, "llistxattr")?;

    let mut size = probe_list_size(&cpath, path)?;
    let mut previous = size;
    for _ in 0..LIST_SIZE_RETRIES {
        if size == 0 {
            return Ok(Vec::new());
        }
        let mut buffer = vec![0u8; size];
        let written = unsafe {
            libc::llistxattr(
                cpath.as_ptr(),
                buffer.as_mut_ptr() as *mut libc::c_char,
                buffer.len(),
            )
        };
        if written >= 0 {
            // A shrink between probe and fetch is fine: the kernel wrote a
            // complete, shorter list.
            buffer.truncate(written as usize);
            return Ok(parse_name_list(&buffer));
        }
        let errno = Errno::last();
        if errno != Errno::ERANGE {
            return Err(os_error("llistxattr", path, errno));
        }
        trace!(path = %path.display(), "xattr name list grew between probe and fetch");
        previous = size;
        size = probe_list_size(&cpath, path)?;
    }

    Err(size_mismatch(path, previous, size))
}

/// Fetch the value of one extended attribute of the object named by `path`
///
/// Non-following, two-phase: a zero-length probe queries the value's size,
/// an exact buffer is allocated, and the value is refetched. A refetch that
/// observes a different size — the attribute was concurrently modified —
/// fails with `SizeMismatch`; the caller may retry a bounded number of
/// times.
///
/// # Errors
///
/// - [`CaptureError::Os`](crate::CaptureError::Os) with
///   `syscall = "lgetxattr"` on outright failure (attribute not present,
///   path missing, unsupported filesystem)
/// - [`CaptureError::SizeMismatch`](crate::CaptureError::SizeMismatch) if
///   the value's size changed between probe and fetch
pub fn get_xattr(path: &Path, name: &OsStr) -> Result<Vec<u8>> {
    let cpath = path_cstring(path, "lgetxattr")?;
    let cname =
        CString::new(name.as_bytes()).map_err(|_| os_error("lgetxattr", path, Errno::EINVAL))?;

    let expected = probe_value_size(&cpath, &cname, path)?;
    if expected == 0 {
        return Ok(Vec::new());
    }

    let mut buffer = vec![0u8; expected];
    let fetched = unsafe {
        libc::lgetxattr(
            cpath.as_ptr(),
            cname.as_ptr(),
            buffer.as_mut_ptr() as *mut libc::c_void,
            buffer.len(),
        )
    };
    if fetched < 0 {
        let errno = Errno::last();
        if errno == Errno::ERANGE {
            // The value grew past our buffer; report what it grew to.
            let actual = probe_value_size(&cpath, &cname, path)?;
            return Err(size_mismatch(path, expected, actual));
        }
        return Err(os_error("lgetxattr", path, errno));
    }
    if fetched as usize != expected {
        return Err(size_mismatch(path, expected, fetched as usize));
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_null_separated_name_lists() {
        assert_eq!(
            parse_name_list(b"user.one\0user.two\0"),
            vec![OsString::from("user.one"), OsString::from("user.two")]
        );
        assert!(parse_name_list(b"").is_empty());
    }

    #[test]
    fn lists_and_fetches_planted_attributes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        std::fs::write(&path, "contents").unwrap();

        // The filesystem may not support user xattrs; skip if so.
        if xattr::set(&path, "user.fscapture", b"planted").is_err() {
            eprintln!("xattrs unsupported on this filesystem, skipping");
            return;
        }

        let names = list_xattrs(&path).unwrap();
        assert!(names.contains(&OsString::from("user.fscapture")));

        let value = get_xattr(&path, OsStr::new("user.fscapture")).unwrap();
        assert_eq!(value, b"planted");
    }

    #[test]
    fn missing_attribute_is_an_os_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        std::fs::write(&path, "contents").unwrap();

        let err = get_xattr(&path, OsStr::new("user.absent")).unwrap_err();
        assert!(matches!(err, crate::CaptureError::Os { syscall: "lgetxattr", .. }));
    }

    #[test]
    fn object_without_attributes_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain");
        std::fs::write(&path, "contents").unwrap();

        assert!(list_xattrs(&path).unwrap().is_empty());
    }
}
