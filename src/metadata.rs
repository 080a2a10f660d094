//! File metadata capture and restore
//!
//! This module turns a path into a typed metadata record via a non-following
//! `lstat(2)`, renders that record as the ordered key/value list the archive
//! serializer consumes, and performs the path-based restore operations
//! (timestamps, ownership) that must act on the link itself.
//!
//! # Capture
//!
//! [`capture`] reports properties of the object named by the path — for a
//! symlink, the link itself, never its target. The resulting
//! [`FileMetadata`] is constructed fresh on every call and owned by the
//! caller.
//!
//! # Restore
//!
//! [`set_timestamps`] and [`set_ownership`] use `utimensat(2)` with
//! `AT_SYMLINK_NOFOLLOW` and `lchown` semantics respectively. Dereferencing
//! a trailing symlink here would silently modify an unrelated target, so
//! both operate on exactly the object named by the path.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use nix::fcntl::AtFlags;
use nix::sys::stat::{self, UtimensatFlags};
use nix::sys::time::TimeSpec;
use nix::unistd::{self, Gid, Uid};

use crate::error::{invalid_kind, os_error, CaptureError, Result};

/// The kind of a filesystem object, from the type bits of its mode
///
/// Exactly one kind holds for every object; it is determined from the raw
/// `S_IFMT` bits, never inferred from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Character device node
    CharDevice,
    /// Block device node
    BlockDevice,
    /// Named pipe (FIFO)
    Fifo,
    /// Symbolic link
    Symlink,
    /// Unix domain socket
    Socket,
}

impl FileKind {
    /// Determine the kind from a raw mode value
    ///
    /// Type predicates are tested in fixed priority order: regular,
    /// directory, character device, block device, fifo, symlink, socket.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidKind`] if no recognized type bits are
    /// set in the mode.
    pub fn from_mode(mode: u32) -> Result<Self> {
        let fmt = mode & libc::S_IFMT as u32;
        if fmt == libc::S_IFREG as u32 {
            Ok(Self::Regular)
        } else if fmt == libc::S_IFDIR as u32 {
            Ok(Self::Directory)
        } else if fmt == libc::S_IFCHR as u32 {
            Ok(Self::CharDevice)
        } else if fmt == libc::S_IFBLK as u32 {
            Ok(Self::BlockDevice)
        } else if fmt == libc::S_IFIFO as u32 {
            Ok(Self::Fifo)
        } else if fmt == libc::S_IFLNK as u32 {
            Ok(Self::Symlink)
        } else if fmt == libc::S_IFSOCK as u32 {
            Ok(Self::Socket)
        } else {
            Err(invalid_kind(format!(
                "no recognized type bits in mode {mode:#o}"
            )))
        }
    }

    /// The wire code for this kind, as stored in the archive
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Regular => "REG",
            Self::Directory => "DIR",
            Self::CharDevice => "CHR",
            Self::BlockDevice => "BLK",
            Self::Fifo => "FIFO",
            Self::Symlink => "LNK",
            Self::Socket => "SOCK",
        }
    }

    /// Whether this kind carries a device number
    #[must_use]
    pub fn is_device(&self) -> bool {
        matches!(self, Self::CharDevice | Self::BlockDevice)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FileKind {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "REG" => Ok(Self::Regular),
            "DIR" => Ok(Self::Directory),
            "CHR" => Ok(Self::CharDevice),
            "BLK" => Ok(Self::BlockDevice),
            "FIFO" => Ok(Self::Fifo),
            "LNK" => Ok(Self::Symlink),
            "SOCK" => Ok(Self::Socket),
            other => Err(invalid_kind(format!("unknown kind code {other:?}"))),
        }
    }
}

/// A second-resolution timestamp with its nanosecond fraction
///
/// Rendered and parsed as `<seconds>.<nanoseconds>` with the fraction always
/// exactly nine zero-padded digits, e.g. `1700000000.123456789`. Seconds may
/// be negative for pre-epoch timestamps; the fraction is always
/// non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimestamp {
    /// Whole seconds since the Unix epoch
    pub seconds: i64,
    /// Nanosecond fraction, `0..1_000_000_000`
    pub nanoseconds: u32,
}

impl FileTimestamp {
    /// Build a timestamp from seconds and a nanosecond fraction
    #[must_use]
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }
}

impl fmt::Display for FileTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

impl FromStr for FileTimestamp {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || CaptureError::InvalidTimestamp(s.to_string());
        let (secs, frac) = s.split_once('.').ok_or_else(bad)?;
        // The fraction is fixed-width: exactly nine digits, no sign.
        if frac.len() != 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let seconds = secs.parse::<i64>().map_err(|_| bad())?;
        let nanoseconds = frac.parse::<u32>().map_err(|_| bad())?;
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }
}

/// The captured description of one filesystem object
///
/// All integral fields are direct copies of the OS-reported values.
/// Constructed fresh on every [`capture`] call and immutable once returned.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Kind of the object, from its type bits
    pub kind: FileKind,
    /// Mode with the type bits masked out: permission, setuid/setgid, and
    /// sticky bits only
    pub permissions: u32,
    /// Device containing the object
    pub dev: u64,
    /// Inode number
    pub ino: u64,
    /// Number of hard links
    pub nlink: u64,
    /// User ID of the owner
    pub uid: u32,
    /// Group ID of the owner
    pub gid: u32,
    /// Size in bytes
    pub size: u64,
    /// Device-number identity of the node; `Some` iff `kind` is
    /// [`FileKind::CharDevice`] or [`FileKind::BlockDevice`]
    pub rdev: Option<u64>,
    /// Last modification time
    pub mtime: FileTimestamp,
    /// Last metadata change time
    pub ctime: FileTimestamp,
}

impl FileMetadata {
    /// Render this record as the ordered attribute list the archive
    /// serializer consumes
    ///
    /// Fields are appended in documented order: `mode`, `dev`, `ino`,
    /// `nlink`, `uid`, `gid`, `rdev` (device kinds only), `size`, `mtime`,
    /// `ctime`.
    #[must_use]
    pub fn attributes(&self) -> AttributeList {
        let mut attrs = AttributeList::new();
        attrs.push("mode", self.permissions.to_string());
        attrs.push("dev", self.dev.to_string());
        attrs.push("ino", self.ino.to_string());
        attrs.push("nlink", self.nlink.to_string());
        attrs.push("uid", self.uid.to_string());
        attrs.push("gid", self.gid.to_string());
        if let Some(rdev) = self.rdev {
            attrs.push("rdev", rdev.to_string());
        }
        attrs.push("size", self.size.to_string());
        attrs.push("mtime", self.mtime.to_string());
        attrs.push("ctime", self.ctime.to_string());
        attrs
    }
}

/// Ordered `(key, value)` pairs describing one filesystem object
///
/// The serialization unit handed to the archive writer. Keys are drawn from
/// the fixed vocabulary `mode`, `dev`, `ino`, `nlink`, `uid`, `gid`, `rdev`,
/// `size`, `mtime`, `ctime`; iteration preserves insertion order.
#[derive(Debug, Clone, Default)]
pub struct AttributeList {
    entries: Vec<(&'static str, String)>,
}

impl AttributeList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, key: &'static str, value: String) {
        self.entries.push((key, value));
    }

    /// Look up a value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Number of pairs in the list
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Capture the metadata of the object named by `path`
///
/// Uses `lstat(2)`, so a trailing symlink is described itself rather than
/// followed.
///
/// # Errors
///
/// - [`CaptureError::Os`] with `syscall = "lstat"` if the stat fails
///   (missing file, permission, broken path component)
/// - [`CaptureError::InvalidKind`] if the mode carries no recognized type
///   bits
#[allow(clippy::unnecessary_cast)] // stat field widths vary across Unix targets
pub fn capture(path: &Path) -> Result<FileMetadata> {
    let st = stat::lstat(path).map_err(|errno| os_error("lstat", path, errno))?;

    let mode = st.st_mode as u32;
    let kind = FileKind::from_mode(mode)?;
    let rdev = if kind.is_device() {
        Some(st.st_rdev as u64)
    } else {
        None
    };

    Ok(FileMetadata {
        kind,
        permissions: mode & !(libc::S_IFMT as u32),
        dev: st.st_dev as u64,
        ino: st.st_ino as u64,
        nlink: st.st_nlink as u64,
        uid: st.st_uid,
        gid: st.st_gid,
        size: st.st_size as u64,
        rdev,
        mtime: FileTimestamp::new(st.st_mtime as i64, st.st_mtime_nsec as u32),
        ctime: FileTimestamp::new(st.st_ctime as i64, st.st_ctime_nsec as u32),
    })
}

/// Restore the modification time of the object named by `path`
///
/// The access time is set to "now" and the modification time to the given
/// value. Uses `utimensat(2)` with `AT_SYMLINK_NOFOLLOW`: a trailing symlink
/// has its own timestamps restored, never its target's.
///
/// # Errors
///
/// Returns [`CaptureError::Os`] with `syscall = "utimensat"` on failure.
pub fn set_timestamps(path: &Path, mtime: FileTimestamp) -> Result<()> {
    let atime_now = TimeSpec::new(0, libc::UTIME_NOW);
    let mtime_spec = TimeSpec::new(mtime.seconds, mtime.nanoseconds as i64);

    stat::utimensat(
        None,
        path,
        &atime_now,
        &mtime_spec,
        UtimensatFlags::NoFollowSymlink,
    )
    .map_err(|errno| os_error("utimensat", path, errno))
}

/// Restore the owner and group of the object named by `path`
///
/// `lchown` semantics: a trailing symlink has its own ownership changed,
/// never its target's.
///
/// # Errors
///
/// Returns [`CaptureError::Os`] with `syscall = "lchown"` on failure.
pub fn set_ownership(path: &Path, uid: u32, gid: u32) -> Result<()> {
    unistd::fchownat(
        None,
        path,
        Some(Uid::from_raw(uid)),
        Some(Gid::from_raw(gid)),
        AtFlags::AT_SYMLINK_NOFOLLOW,
    )
    .map_err(|errno| os_error("lchown", path, errno))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_mode_matches_type_bits() {
        let cases = [
            (libc::S_IFREG, FileKind::Regular),
            (libc::S_IFDIR, FileKind::Directory),
            (libc::S_IFCHR, FileKind::CharDevice),
            (libc::S_IFBLK, FileKind::BlockDevice),
            (libc::S_IFIFO, FileKind::Fifo),
            (libc::S_IFLNK, FileKind::Symlink),
            (libc::S_IFSOCK, FileKind::Socket),
        ];
        for (bits, expected) in cases {
            let kind = FileKind::from_mode(bits as u32 | 0o644).unwrap();
            assert_eq!(kind, expected);
        }
    }

    #[test]
    fn kind_from_mode_rejects_unrecognized_type_bits() {
        let err = FileKind::from_mode(0o644).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidKind(_)));
    }

    #[test]
    fn kind_codes_round_trip() {
        for code in ["REG", "DIR", "CHR", "BLK", "FIFO", "LNK", "SOCK"] {
            let kind: FileKind = code.parse().unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!("SYMLINK".parse::<FileKind>().is_err());
    }

    #[test]
    fn timestamp_renders_nine_digit_fraction() {
        assert_eq!(
            FileTimestamp::new(1_700_000_000, 123_456_789).to_string(),
            "1700000000.123456789"
        );
        assert_eq!(FileTimestamp::new(5, 42).to_string(), "5.000000042");
    }

    #[test]
    fn timestamp_parse_round_trips() {
        for text in ["1700000000.123456789", "0.000000000", "-5.000000042"] {
            let ts: FileTimestamp = text.parse().unwrap();
            assert_eq!(ts.to_string(), text);
        }
    }

    #[test]
    fn timestamp_parse_rejects_malformed_text() {
        let malformed = [
            "1700000000",
            "1.123",
            "1.1234567890",
            "1.12345678x",
            ".123456789",
            "a.123456789",
        ];
        for text in malformed {
            assert!(
                text.parse::<FileTimestamp>().is_err(),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn attribute_list_preserves_insertion_order() {
        let meta = FileMetadata {
            kind: FileKind::CharDevice,
            permissions: 0o660,
            dev: 10,
            ino: 20,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: 0,
            rdev: Some(0x0103),
            mtime: FileTimestamp::new(1, 0),
            ctime: FileTimestamp::new(2, 0),
        };
        let keys: Vec<_> = meta.attributes().iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            ["mode", "dev", "ino", "nlink", "uid", "gid", "rdev", "size", "mtime", "ctime"]
        );
    }

    #[test]
    fn rdev_key_absent_for_non_device_kinds() {
        let meta = FileMetadata {
            kind: FileKind::Regular,
            permissions: 0o644,
            dev: 1,
            ino: 2,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            size: 3,
            rdev: None,
            mtime: FileTimestamp::new(0, 0),
            ctime: FileTimestamp::new(0, 0),
        };
        let attrs = meta.attributes();
        assert_eq!(attrs.get("rdev"), None);
        assert_eq!(attrs.len(), 9);
    }
}
