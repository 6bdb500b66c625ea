//! Information about the filesystems mounted on the host.
//!
//! Handlers for the root container report every host filesystem; the
//! [`FsInfo`] capability is what they query for it.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::mountinfo::{self, MountEntry};

/// Filesystem types that never hold container data.
const PSEUDO_FS_TYPES: &[&str] = &[
    "proc",
    "sysfs",
    "cgroup",
    "cgroup2",
    "devpts",
    "mqueue",
    "debugfs",
    "tracefs",
    "securityfs",
    "pstore",
    "bpf",
    "configfs",
    "fusectl",
    "hugetlbfs",
    "autofs",
    "binfmt_misc",
    "nsfs",
    "rpc_pipefs",
];

/// A mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Filesystem {
    pub device: String,
    pub major_minor: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

impl From<MountEntry> for Filesystem {
    fn from(entry: MountEntry) -> Self {
        Self {
            device: entry.source,
            major_minor: entry.major_minor,
            mount_point: entry.mount_point,
            fs_type: entry.fs_type,
        }
    }
}

/// Capability to query the host's mounted filesystems.
pub trait FsInfo: fmt::Debug + Send + Sync {
    /// Every non-pseudo filesystem, in mount order.
    fn filesystems(&self) -> mountinfo::Result<Vec<Filesystem>>;

    /// The filesystem holding `path`, chosen by longest mount point prefix.
    fn filesystem_for_path(&self, path: &Path) -> mountinfo::Result<Option<Filesystem>> {
        Ok(self
            .filesystems()?
            .into_iter()
            .filter(|fs| path.starts_with(&fs.mount_point))
            .max_by_key(|fs| fs.mount_point.components().count()))
    }
}

/// [`FsInfo`] backed by a mountinfo file, re-read on every query.
#[derive(Debug, Clone)]
pub struct MountInfoFsInfo {
    mountinfo_path: PathBuf,
}

impl MountInfoFsInfo {
    pub fn new(mountinfo_path: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo_path: mountinfo_path.into(),
        }
    }
}

impl FsInfo for MountInfoFsInfo {
    fn filesystems(&self) -> mountinfo::Result<Vec<Filesystem>> {
        Ok(mountinfo::read_mounts(&self.mountinfo_path)?
            .into_iter()
            .filter(|entry| !PSEUDO_FS_TYPES.contains(&entry.fs_type.as_str()))
            .map(Filesystem::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fs_info_from(contents: &str) -> (tempfile::NamedTempFile, MountInfoFsInfo) {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{contents}").unwrap();
        let info = MountInfoFsInfo::new(tmp.path());
        (tmp, info)
    }

    const MOUNTINFO: &str = "\
22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw
25 22 0:23 / /proc rw,nosuid - proc proc rw
35 24 0:30 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw
40 22 8:17 / /var/lib/docker rw,relatime - xfs /dev/sdb1 rw
";

    #[test]
    fn test_filesystems_skip_pseudo_filesystems() {
        let (_tmp, info) = fs_info_from(MOUNTINFO);
        let filesystems = info.filesystems().unwrap();
        let devices: Vec<_> = filesystems.iter().map(|fs| fs.device.as_str()).collect();
        assert_eq!(devices, vec!["/dev/sda1", "/dev/sdb1"]);
    }

    #[test]
    fn test_filesystem_for_path_prefers_longest_mount_point() {
        let (_tmp, info) = fs_info_from(MOUNTINFO);
        let fs = info
            .filesystem_for_path(Path::new("/var/lib/docker/overlay2"))
            .unwrap()
            .unwrap();
        assert_eq!(fs.device, "/dev/sdb1");

        let fs = info
            .filesystem_for_path(Path::new("/home/user"))
            .unwrap()
            .unwrap();
        assert_eq!(fs.device, "/dev/sda1");
    }

    #[test]
    fn test_filesystems_missing_mountinfo() {
        let info = MountInfoFsInfo::new("/definitely/does/not/exist");
        assert!(info.filesystems().is_err());
    }
}
