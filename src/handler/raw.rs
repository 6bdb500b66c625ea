use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ContainerHandler, Error, HandlerBuilder, HandlerContext, Result};
use crate::cgroup::make_cgroup_paths;
use crate::container::{ContainerName, MetricKind, MetricSet};
use crate::error::ResultOkLogExt;
use crate::fs::{Filesystem, FsInfo};
use crate::machine::{MachineInfo, MachineInfoFactory};
use crate::watcher::ChangeWatcher;

/// Builds [`RawHandler`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawHandlerBuilder;

impl HandlerBuilder for RawHandlerBuilder {
    fn build_handler(&self, ctx: HandlerContext<'_>) -> Result<Box<dyn ContainerHandler>> {
        Ok(Box::new(RawHandler::new(ctx)?))
    }
}

/// A handler for a plain cgroup, without any container runtime metadata.
#[derive(Debug)]
pub struct RawHandler {
    name: ContainerName,
    cgroup_paths: BTreeMap<String, PathBuf>,
    root_fs: PathBuf,
    included_metrics: MetricSet,
    machine_info_factory: Arc<dyn MachineInfoFactory>,
    fs_info: Arc<dyn FsInfo>,
    watcher: Arc<dyn ChangeWatcher>,
    /// Directories registered with `watcher`, released on cleanup.
    watched: Vec<PathBuf>,
}

impl RawHandler {
    /// Resolves the cgroup directories of the container and watches those that exist.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if the name is not a valid container name.
    /// - [`Error::Watch`] if a cgroup directory cannot be watched. Watches added
    ///   before the failure are removed again.
    pub fn new(ctx: HandlerContext<'_>) -> Result<Self> {
        let name = ContainerName::new(ctx.name)?;
        let mut cgroup_paths = make_cgroup_paths(ctx.subsystems.mount_points(), ctx.name);
        if name.is_root() {
            // The root cgroup has no `pids.current`.
            cgroup_paths.remove("pids");
        }

        let watched = watch_cgroup_dirs(&name, &cgroup_paths, ctx.watcher.as_ref())?;
        log::debug!(
            "created raw handler for {} with {} cgroup paths",
            name,
            cgroup_paths.len()
        );

        Ok(Self {
            name,
            cgroup_paths,
            root_fs: ctx.root_fs.to_path_buf(),
            included_metrics: ctx.included_metrics.clone(),
            machine_info_factory: Arc::clone(ctx.machine_info_factory),
            fs_info: Arc::clone(ctx.fs_info),
            watcher: Arc::clone(ctx.watcher),
            watched,
        })
    }

    fn cgroup_dirs(&self) -> BTreeSet<&PathBuf> {
        self.cgroup_paths.values().collect()
    }
}

/// Watches every existing cgroup directory, rolling back on the first failure.
fn watch_cgroup_dirs(
    name: &ContainerName,
    cgroup_paths: &BTreeMap<String, PathBuf>,
    watcher: &dyn ChangeWatcher,
) -> Result<Vec<PathBuf>> {
    let dirs: BTreeSet<&PathBuf> = cgroup_paths.values().collect();
    let mut watched: Vec<PathBuf> = Vec::with_capacity(dirs.len());

    for dir in dirs.into_iter().filter(|dir| dir.is_dir()) {
        if let Err(source) = watcher.add_watch(name.as_ref(), dir) {
            for added in &watched {
                watcher.remove_watch(name.as_ref(), added).ok_log();
            }
            return Err(Error::Watch {
                name: name.to_string(),
                source,
            });
        }
        watched.push(dir.clone());
    }

    Ok(watched)
}

impl ContainerHandler for RawHandler {
    fn name(&self) -> &ContainerName {
        &self.name
    }

    fn cgroup_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.cgroup_paths
    }

    fn root_fs(&self) -> &Path {
        &self.root_fs
    }

    fn exists(&self) -> bool {
        self.cgroup_paths.values().any(|path| path.exists())
    }

    fn list_containers(&self, recursive: bool) -> Result<Vec<ContainerName>> {
        let mut out = BTreeSet::new();
        for cgroup_dir in self.cgroup_dirs() {
            let mut stack = vec![(cgroup_dir.clone(), self.name.clone())];
            while let Some((dir, parent)) = stack.pop() {
                let entries = match std::fs::read_dir(&dir) {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(source) => return Err(Error::ListContainers { path: dir, source }),
                };

                for entry in entries {
                    let entry = entry.map_err(|source| Error::ListContainers {
                        path: dir.clone(),
                        source,
                    })?;
                    let file_type = entry.file_type().map_err(|source| Error::ListContainers {
                        path: entry.path(),
                        source,
                    })?;
                    if !file_type.is_dir() {
                        continue;
                    }

                    let file_name = entry.file_name();
                    let Some(segment) = file_name.to_str() else {
                        log::warn!("skipping non UTF-8 cgroup `{}`", entry.path().display());
                        continue;
                    };
                    let child = parent.child(segment)?;
                    if recursive {
                        stack.push((entry.path(), child.clone()));
                    }
                    out.insert(child);
                }
            }
        }

        Ok(out.into_iter().collect())
    }

    fn filesystems(&self) -> Result<Vec<Filesystem>> {
        if !self.name.is_root() || !self.included_metrics.has(MetricKind::DiskUsage) {
            return Ok(Vec::new());
        }
        Ok(self.fs_info.filesystems()?)
    }

    fn machine_info(&self) -> Result<MachineInfo> {
        Ok(self.machine_info_factory.machine_info()?)
    }

    fn cleanup(&self) {
        for dir in &self.watched {
            self.watcher.remove_watch(self.name.as_ref(), dir).ok_log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::{CgroupMount, CgroupSubsystems};
    use crate::testutil::{FakeFsInfo, FakeMachineInfoFactory, RecordingWatcher};

    struct Fixture {
        cgroup_root: tempfile::TempDir,
        subsystems: CgroupSubsystems,
        machine_info_factory: Arc<dyn MachineInfoFactory>,
        fs_info: Arc<dyn FsInfo>,
        watcher: Arc<RecordingWatcher>,
    }

    impl Fixture {
        /// A v1 layout with `cpu,cpuacct`, `memory` and `pids` hierarchies.
        fn new() -> Self {
            let cgroup_root = tempfile::tempdir().unwrap();
            let mut mounts = Vec::new();
            for (dir, subsystems) in [
                ("cpu,cpuacct", vec!["cpu", "cpuacct"]),
                ("memory", vec!["memory"]),
                ("pids", vec!["pids"]),
            ] {
                let mount_point = cgroup_root.path().join(dir);
                std::fs::create_dir(&mount_point).unwrap();
                mounts.push(CgroupMount {
                    mount_point,
                    root: PathBuf::from("/"),
                    subsystems: subsystems.into_iter().map(str::to_owned).collect(),
                });
            }

            Self {
                subsystems: CgroupSubsystems::from_mounts(mounts, &[]),
                cgroup_root,
                machine_info_factory: Arc::new(FakeMachineInfoFactory),
                fs_info: Arc::new(FakeFsInfo),
                watcher: Arc::new(RecordingWatcher::default()),
            }
        }

        fn mkdir(&self, relative: &str) {
            for hierarchy in ["cpu,cpuacct", "memory", "pids"] {
                std::fs::create_dir_all(self.cgroup_root.path().join(hierarchy).join(relative))
                    .unwrap();
            }
        }

        fn build(&self, name: &str, metrics: &MetricSet) -> Result<RawHandler> {
            let watcher: Arc<dyn ChangeWatcher> = self.watcher.clone();
            RawHandler::new(HandlerContext {
                name,
                subsystems: &self.subsystems,
                machine_info_factory: &self.machine_info_factory,
                fs_info: &self.fs_info,
                watcher: &watcher,
                root_fs: Path::new("/rootfs"),
                included_metrics: metrics,
            })
        }
    }

    #[test]
    fn test_root_handler_drops_pids_path() {
        let fixture = Fixture::new();
        let handler = fixture.build("/", &MetricSet::all()).unwrap();

        assert!(!handler.cgroup_paths().contains_key("pids"));
        assert_eq!(
            handler.cgroup_paths()["memory"],
            fixture.cgroup_root.path().join("memory")
        );
        assert_eq!(handler.root_fs(), Path::new("/rootfs"));
        assert!(handler.exists());
    }

    #[test]
    fn test_handler_watches_existing_cgroup_dirs_once() {
        let fixture = Fixture::new();
        fixture.mkdir("docker/abc");
        let handler = fixture.build("/docker/abc", &MetricSet::all()).unwrap();

        assert_eq!(handler.cgroup_paths().len(), 4);
        let watches = fixture.watcher.current_watches();
        // `cpu` and `cpuacct` share one directory.
        assert_eq!(watches["/docker/abc"].len(), 3);

        handler.cleanup();
        assert!(fixture.watcher.current_watches().is_empty());
    }

    #[test]
    fn test_handler_for_missing_cgroup() {
        let fixture = Fixture::new();
        let handler = fixture.build("/gone", &MetricSet::all()).unwrap();
        assert!(!handler.exists());
        assert!(fixture.watcher.current_watches().is_empty());
        assert!(handler.list_containers(true).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let fixture = Fixture::new();
        let err = fixture.build("", &MetricSet::all()).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[test]
    fn test_watch_failure_rolls_back() {
        let fixture = Fixture::new();
        fixture.mkdir("docker/abc");
        let pids = fixture.cgroup_root.path().join("pids/docker/abc");
        fixture.watcher.fail_on(pids);

        let err = fixture.build("/docker/abc", &MetricSet::all()).unwrap_err();
        assert!(matches!(err, Error::Watch { .. }));
        assert!(fixture.watcher.current_watches().is_empty());
    }

    #[test]
    fn test_cleanup_keeps_watches_of_other_handlers() {
        let fixture = Fixture::new();
        fixture.mkdir("docker/abc");
        let first = fixture.build("/docker/abc", &MetricSet::all()).unwrap();
        let second = fixture.build("/docker/abc", &MetricSet::all()).unwrap();

        first.cleanup();
        assert_eq!(fixture.watcher.current_watches()["/docker/abc"].len(), 3);

        second.cleanup();
        assert!(fixture.watcher.current_watches().is_empty());
    }

    #[test]
    fn test_rollback_keeps_watches_of_other_handlers() {
        let fixture = Fixture::new();
        for hierarchy in ["cpu,cpuacct", "memory"] {
            let dir = fixture.cgroup_root.path().join(hierarchy).join("docker/abc");
            std::fs::create_dir_all(dir).unwrap();
        }
        let _live = fixture.build("/docker/abc", &MetricSet::all()).unwrap();
        let pids = fixture.cgroup_root.path().join("pids/docker/abc");
        std::fs::create_dir_all(&pids).unwrap();
        fixture.watcher.fail_on(&pids);

        let err = fixture.build("/docker/abc", &MetricSet::all()).unwrap_err();
        assert!(matches!(err, Error::Watch { .. }));
        assert_eq!(fixture.watcher.current_watches()["/docker/abc"].len(), 2);
    }

    #[test]
    fn test_inotify_watches_survive_cleanup_of_other_handler() {
        let fixture = Fixture::new();
        fixture.mkdir("docker/abc");
        let inotify: Arc<dyn ChangeWatcher> =
            Arc::new(crate::watcher::InotifyWatcher::new().unwrap());
        let build = || {
            RawHandler::new(HandlerContext {
                name: "/docker/abc",
                subsystems: &fixture.subsystems,
                machine_info_factory: &fixture.machine_info_factory,
                fs_info: &fixture.fs_info,
                watcher: &inotify,
                root_fs: Path::new("/"),
                included_metrics: &MetricSet::all(),
            })
            .unwrap()
        };
        let first = build();
        let second = build();

        first.cleanup();
        assert_eq!(inotify.current_watches()["/docker/abc"].len(), 3);
        second.cleanup();
        assert!(inotify.current_watches().is_empty());
    }

    #[test]
    fn test_list_containers() {
        let fixture = Fixture::new();
        fixture.mkdir("docker/abc");
        fixture.mkdir("system.slice/sshd.service");
        std::fs::write(fixture.cgroup_root.path().join("memory/memory.stat"), "").unwrap();
        let handler = fixture.build("/", &MetricSet::all()).unwrap();

        let direct = handler.list_containers(false).unwrap();
        let direct: Vec<&str> = direct.iter().map(|name| name.as_ref()).collect();
        assert_eq!(direct, vec!["/docker", "/system.slice"]);

        let all = handler.list_containers(true).unwrap();
        let all: Vec<&str> = all.iter().map(|name| name.as_ref()).collect();
        assert_eq!(
            all,
            vec![
                "/docker",
                "/docker/abc",
                "/system.slice",
                "/system.slice/sshd.service"
            ]
        );
    }

    #[test]
    fn test_filesystems_only_for_root_with_disk_metrics() {
        let fixture = Fixture::new();
        fixture.mkdir("docker");

        let root = fixture.build("/", &MetricSet::all()).unwrap();
        assert_eq!(root.filesystems().unwrap().len(), 1);

        let child = fixture.build("/docker", &MetricSet::all()).unwrap();
        assert!(child.filesystems().unwrap().is_empty());

        let without_disk = fixture
            .build("/", &MetricSet::all_except(&[MetricKind::DiskUsage]))
            .unwrap();
        assert!(without_disk.filesystems().unwrap().is_empty());
    }

    #[test]
    fn test_machine_info_passthrough() {
        let fixture = Fixture::new();
        let handler = fixture.build("/", &MetricSet::all()).unwrap();
        assert_eq!(handler.machine_info().unwrap().hostname, "test-host");
    }
}
