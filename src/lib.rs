//! # fs-capture
//!
//! Filesystem metadata capture and restore for backup and archival tools:
//!
//! - Non-following stat capture into a typed, serializable metadata record
//! - Extended attribute listing and two-phase value fetch
//! - Lazy directory enumeration with inode numbers for hard link detection
//! - Access-time preserving file opens (`O_NOATIME` with fallback)
//! - Timestamp and ownership restoration that never follows symlinks
//! - Special file (device/fifo/socket) recreation from captured metadata
//! - Path canonicalization
//!
//! This crate is the boundary layer between a backup tool and the POSIX
//! filesystem: it captures everything needed to faithfully describe and
//! later recreate a filesystem object, and nothing else. Archive packing,
//! content hashing, and scheduling belong to its callers.
//!
//! All operations are synchronous and block on local syscalls; parallelism
//! across paths, timeouts, and retry policy are the caller's
//! responsibility.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fs_capture::{capture, list_xattrs};
//! use std::path::Path;
//!
//! # fn example() -> fs_capture::Result<()> {
//! let meta = capture(Path::new("/etc/hostname"))?;
//! println!("kind: {}", meta.kind);
//! for (key, value) in meta.attributes().iter() {
//!     println!("{key} = {value}");
//! }
//! for name in list_xattrs(Path::new("/etc/hostname"))? {
//!     println!("xattr: {name:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod directory;
pub mod error;
pub mod metadata;
pub mod open;
pub mod resolve;
pub mod xattr;

// Re-export main types
pub use device::{create_special, create_special_from_code};
pub use directory::{DirReader, DirectoryEntry};
pub use error::{CaptureError, Result};
pub use metadata::{
    capture, set_ownership, set_timestamps, AttributeList, FileKind, FileMetadata, FileTimestamp,
};
pub use open::open_for_read;
pub use resolve::canonicalize;
pub use xattr::{get_xattr, list_xattrs};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
