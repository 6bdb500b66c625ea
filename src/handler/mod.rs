//! Container handlers and their construction.
//!
//! A factory that accepts a container delegates to a [`HandlerBuilder`], handing it
//! everything the handler needs through a [`HandlerContext`].
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod error;
mod raw;

pub use error::{Error, Result};
pub use raw::{RawHandler, RawHandlerBuilder};

use crate::cgroup::CgroupSubsystems;
use crate::container::{ContainerName, MetricSet};
use crate::fs::{Filesystem, FsInfo};
use crate::machine::{MachineInfo, MachineInfoFactory};
use crate::watcher::ChangeWatcher;

/// Access to a single container.
pub trait ContainerHandler: fmt::Debug + Send + Sync {
    fn name(&self) -> &ContainerName;

    /// The container's cgroup directory per controller.
    fn cgroup_paths(&self) -> &BTreeMap<String, PathBuf>;

    /// The host root as seen by this process.
    fn root_fs(&self) -> &Path;

    /// Whether any of the container's cgroup directories still exists.
    fn exists(&self) -> bool;

    /// Lists the subcontainers, sorted by name.
    fn list_containers(&self, recursive: bool) -> Result<Vec<ContainerName>>;

    /// The filesystems attributed to the container.
    fn filesystems(&self) -> Result<Vec<Filesystem>>;

    fn machine_info(&self) -> Result<MachineInfo>;

    /// Releases everything the handler registered, e.g. directory watches.
    fn cleanup(&self);
}

/// Everything a factory passes on to construct a handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub name: &'a str,
    pub subsystems: &'a CgroupSubsystems,
    pub machine_info_factory: &'a Arc<dyn MachineInfoFactory>,
    pub fs_info: &'a Arc<dyn FsInfo>,
    pub watcher: &'a Arc<dyn ChangeWatcher>,
    pub root_fs: &'a Path,
    pub included_metrics: &'a MetricSet,
}

/// Capability to construct handlers.
pub trait HandlerBuilder: fmt::Debug + Send + Sync {
    fn build_handler(&self, ctx: HandlerContext<'_>) -> Result<Box<dyn ContainerHandler>>;
}
