//! Cgroup controller discovery.
//!
//! Resolves which cgroup controllers are mounted on the host and where, for both
//! the v1 (one hierarchy per controller group) and the v2 (unified) layout.
//!
//! # Key Components
//!
//! - [`CgroupSubsystems`]: The supported controller mounts, keyed by controller name.
//! - [`SubsystemDiscovery`]: The capability consumed by the raw factory bootstrap.
//! - [`MountInfoSubsystemDiscovery`]: Resolves mounts from a `mountinfo` table.
//!
//! # Supported Controllers
//!
//! `cpu`, `cpuacct`, `memory`, `hugetlb`, `pids`, `cpuset`, `blkio`, `io`, `devices`
//! and `perf_event`. Disk I/O controllers are only resolved when disk I/O metrics are
//! included.
mod error;
mod subsystems;

pub use error::{Error, Result};
pub use subsystems::{
    CgroupMount, CgroupSubsystems, MountInfoSubsystemDiscovery, SubsystemDiscovery,
    make_cgroup_paths,
};
