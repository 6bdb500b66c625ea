//! Reading of `/proc/[pid]/mountinfo` tables.
//!
//! Both the cgroup subsystem discovery and the filesystem information
//! provider work on the owned [`MountEntry`] list returned by [`read_mounts`].
mod error;
mod parser;
mod table;

pub use error::{Error, Result};
pub use parser::{MountInfo, MountInfoField, ParseError, parse_mount_info_line};
pub use table::{MountEntry, read_mounts};
