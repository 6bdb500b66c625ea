use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Error, Result};
use crate::container::{MetricKind, MetricSet};
use crate::fsutil;
use crate::mountinfo::{self, MountEntry};

/// Controllers a cgroup v1 hierarchy may carry in its superblock options.
const V1_CONTROLLERS: &[&str] = &[
    "cpu",
    "cpuacct",
    "cpuset",
    "memory",
    "devices",
    "freezer",
    "net_cls",
    "net_prio",
    "blkio",
    "perf_event",
    "hugetlb",
    "pids",
    "rdma",
    "misc",
];

/// Controllers container handlers know how to read.
const SUPPORTED_SUBSYSTEMS: &[&str] = &[
    "cpu",
    "cpuacct",
    "memory",
    "hugetlb",
    "pids",
    "cpuset",
    "blkio",
    "io",
    "devices",
    "perf_event",
];

/// A mounted cgroup hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CgroupMount {
    pub mount_point: PathBuf,
    pub root: PathBuf,
    pub subsystems: Vec<String>,
}

/// The supported cgroup controllers and their mount points.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CgroupSubsystems {
    /// Supported mounts, each listed once even if it carries several controllers.
    mounts: Vec<CgroupMount>,
    /// Controller name to mount point.
    mount_points: BTreeMap<String, PathBuf>,
}

impl CgroupSubsystems {
    /// Selects the supported controllers from every cgroup mount on the host.
    ///
    /// A controller mounted more than once keeps its first mount. Controllers in
    /// `disabled` are skipped.
    pub fn from_mounts(all: Vec<CgroupMount>, disabled: &[&str]) -> Self {
        let mut out = CgroupSubsystems::default();
        let mut recorded_mount_points = HashSet::new();

        for mount in all {
            for subsystem in &mount.subsystems {
                if disabled.contains(&subsystem.as_str())
                    || !SUPPORTED_SUBSYSTEMS.contains(&subsystem.as_str())
                {
                    continue;
                }
                if let Some(existing) = out.mount_points.get(subsystem) {
                    log::trace!(
                        "skipping {}, already using mount at {}",
                        mount.mount_point.display(),
                        existing.display()
                    );
                    continue;
                }
                let mount_point = mount.mount_point.clone();
                if recorded_mount_points.insert(mount_point.clone()) {
                    out.mounts.push(mount.clone());
                }
                out.mount_points.insert(subsystem.clone(), mount_point);
            }
        }

        out
    }

    pub fn mounts(&self) -> &[CgroupMount] {
        &self.mounts
    }

    pub fn mount_points(&self) -> &BTreeMap<String, PathBuf> {
        &self.mount_points
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

/// Capability to resolve the cgroup controllers available for the given metrics.
pub trait SubsystemDiscovery: fmt::Debug {
    fn discover_mounts(&self, included_metrics: &MetricSet) -> Result<CgroupSubsystems>;
}

/// Resolves cgroup controllers from a `mountinfo` table, e.g. `/proc/self/mountinfo`.
#[derive(Debug, Clone)]
pub struct MountInfoSubsystemDiscovery {
    mountinfo_path: PathBuf,
}

impl MountInfoSubsystemDiscovery {
    pub fn new(mountinfo_path: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo_path: mountinfo_path.into(),
        }
    }
}

impl Default for MountInfoSubsystemDiscovery {
    fn default() -> Self {
        Self::new("/proc/self/mountinfo")
    }
}

impl SubsystemDiscovery for MountInfoSubsystemDiscovery {
    fn discover_mounts(&self, included_metrics: &MetricSet) -> Result<CgroupSubsystems> {
        let entries = mountinfo::read_mounts(&self.mountinfo_path)?;
        let all = cgroup_mounts(entries)?;
        if all.is_empty() {
            return Err(Error::MissingCgroupMounts {
                path: self.mountinfo_path.clone(),
            });
        }

        let disabled = disabled_subsystems(included_metrics);
        let subsystems = CgroupSubsystems::from_mounts(all, &disabled);
        log::debug!(
            "resolved cgroup controllers: {:?}",
            subsystems.mount_points().keys().collect::<Vec<_>>()
        );
        Ok(subsystems)
    }
}

/// Controllers that are not needed for the included metrics.
fn disabled_subsystems(included_metrics: &MetricSet) -> Vec<&'static str> {
    if included_metrics.has(MetricKind::DiskIo) {
        Vec::new()
    } else {
        vec!["blkio", "io"]
    }
}

/// Extracts every cgroup hierarchy with its controllers from the mount table.
fn cgroup_mounts(entries: Vec<MountEntry>) -> Result<Vec<CgroupMount>> {
    let mut mounts = Vec::new();
    for entry in entries {
        let subsystems = match entry.fs_type.as_str() {
            "cgroup" => entry
                .super_options
                .iter()
                .filter(|opt| V1_CONTROLLERS.contains(&opt.as_str()))
                .cloned()
                .collect(),
            "cgroup2" => unified_controllers(&entry.mount_point)?,
            _ => continue,
        };
        mounts.push(CgroupMount {
            mount_point: entry.mount_point,
            root: entry.root,
            subsystems,
        });
    }
    Ok(mounts)
}

fn unified_controllers(mount_point: &Path) -> Result<Vec<String>> {
    let path = mount_point.join("cgroup.controllers");
    let controllers =
        fsutil::read_trimmed(&path).map_err(|source| Error::Controllers { path, source })?;
    Ok(controllers.split_whitespace().map(str::to_owned).collect())
}

/// Returns the cgroup directory of container `name` under every controller mount point.
///
/// # Example
///
/// ```
/// # use std::collections::BTreeMap;
/// # use std::path::PathBuf;
/// # use creo_discovery::cgroup::make_cgroup_paths;
/// let memory = PathBuf::from("/sys/fs/cgroup/memory");
/// let mount_points = BTreeMap::from([("memory".to_owned(), memory)]);
/// let paths = make_cgroup_paths(&mount_points, "/docker/abc");
/// assert_eq!(paths["memory"], PathBuf::from("/sys/fs/cgroup/memory/docker/abc"));
/// ```
pub fn make_cgroup_paths(
    mount_points: &BTreeMap<String, PathBuf>,
    name: &str,
) -> BTreeMap<String, PathBuf> {
    let relative = name.trim_start_matches('/');
    mount_points
        .iter()
        .map(|(subsystem, mount_point)| {
            let path = if relative.is_empty() {
                mount_point.clone()
            } else {
                mount_point.join(relative)
            };
            (subsystem.clone(), path)
        })
        .collect()
}
