use std::path::{Path, PathBuf};

use serde::Serialize;

use super::checks::{
    contains_proc_mount, has_container_indicators, is_pid_namespace_isolated,
    matches_container_cgroup,
};
use super::{Error, Result};

/// Where this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    /// Running directly on the host.
    Host,
    /// Running inside a container (Docker, Kubernetes, Podman, ...).
    Container,
}

impl RuntimeEnvironment {
    /// Whether the process shares the host's namespaces.
    pub fn in_host_namespace(self) -> bool {
        matches!(self, RuntimeEnvironment::Host)
    }

    /// The path of the host root filesystem as seen by this process.
    ///
    /// On the host this is `/`. In a container it is `configured`, which must exist.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingHostRoot`] if running in a container and `configured` is missing.
    /// * [`Error::ExistenceCheck`] if its existence cannot be determined.
    pub fn host_rootfs(self, configured: &Path) -> Result<PathBuf> {
        match self {
            RuntimeEnvironment::Host => Ok(PathBuf::from("/")),
            RuntimeEnvironment::Container => {
                let exists = configured
                    .try_exists()
                    .map_err(|source| Error::ExistenceCheck {
                        path: configured.to_path_buf(),
                        source,
                    })?;
                if !exists {
                    return Err(Error::MissingHostRoot {
                        path: configured.to_path_buf(),
                    });
                }
                Ok(configured.to_path_buf())
            }
        }
    }
}

/// The files inspected by [`Probe::detect`].
#[derive(Debug, Clone)]
pub struct Probe {
    /// Root filesystem of the host, possibly mounted into this container.
    pub rootfs: PathBuf,
    /// procfs of this process.
    pub proc_root: PathBuf,
    /// Directory holding container marker files such as `.dockerenv`.
    pub marker_root: PathBuf,
}

impl Probe {
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
            proc_root: PathBuf::from("/proc"),
            marker_root: PathBuf::from("/"),
        }
    }

    /// Runs the checks in order and stops at the first one indicating a container:
    ///
    /// 1. the pid namespace of the init process under `rootfs` differs from ours;
    /// 2. our cgroup membership names a container runtime or ID;
    /// 3. marker files or variables exist.
    ///
    /// Failing checks are logged as warnings and treated as negative.
    pub fn detect(&self) -> RuntimeEnvironment {
        match contains_proc_mount(&self.rootfs) {
            Ok(true) => match is_pid_namespace_isolated(&self.proc_root, &self.rootfs) {
                Ok(true) => return RuntimeEnvironment::Container,
                Ok(false) => {}
                Err(err) => log::warn!(
                    "Namespace check failed when detecting runtime environment: {}",
                    err
                ),
            },
            Ok(false) => {}
            Err(err) => log::warn!("Failed to determine presence of /proc in rootfs: {}", err),
        }

        match matches_container_cgroup(&self.proc_root.join("self/cgroup")) {
            Ok(true) => return RuntimeEnvironment::Container,
            Ok(false) => {}
            Err(err) => log::warn!("Cgroup analysis failed during runtime detection: {}", err),
        }

        if has_container_indicators(&self.marker_root) {
            return RuntimeEnvironment::Container;
        }

        RuntimeEnvironment::Host
    }
}

/// Detects whether this process runs on the host or in a container, probing the
/// host root filesystem mounted at `rootfs`.
pub fn detect_runtime_environment(rootfs: impl AsRef<Path>) -> RuntimeEnvironment {
    let env = Probe::new(rootfs.as_ref()).detect();
    log::debug!("Detected runtime environment: {:?}", env);
    env
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        probe: Probe,
    }

    fn fixture(self_cgroup: &str, self_ns: &str, init_ns: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let proc_root = dir.path().join("proc");
        let rootfs = dir.path().join("rootfs");
        let marker_root = dir.path().join("markers");
        fs::create_dir_all(proc_root.join("self/ns")).unwrap();
        fs::create_dir_all(&marker_root).unwrap();
        fs::write(proc_root.join("self/cgroup"), self_cgroup).unwrap();
        symlink(self_ns, proc_root.join("self/ns/pid")).unwrap();
        if let Some(init_ns) = init_ns {
            fs::create_dir_all(rootfs.join("proc/1/ns")).unwrap();
            symlink(init_ns, rootfs.join("proc/1/ns/pid")).unwrap();
        } else {
            fs::create_dir_all(&rootfs).unwrap();
        }

        Fixture {
            _dir: dir,
            probe: Probe {
                rootfs,
                proc_root,
                marker_root,
            },
        }
    }

    #[test]
    fn test_detect_host() {
        if std::env::var_os("container").is_some() {
            return;
        }
        let f = fixture("0::/init.scope\n", "pid:[1]", Some("pid:[1]"));
        assert_eq!(f.probe.detect(), RuntimeEnvironment::Host);
    }

    #[test]
    fn test_detect_container_by_namespace() {
        let f = fixture("0::/\n", "pid:[2]", Some("pid:[1]"));
        assert_eq!(f.probe.detect(), RuntimeEnvironment::Container);
    }

    #[test]
    fn test_detect_container_by_cgroup() {
        let f = fixture("0::/kubepods/burstable/pod1/abc\n", "pid:[1]", None);
        assert_eq!(f.probe.detect(), RuntimeEnvironment::Container);
    }

    #[test]
    fn test_detect_container_by_marker() {
        let f = fixture("0::/\n", "pid:[1]", None);
        fs::write(f.probe.marker_root.join(".dockerenv"), "").unwrap();
        assert_eq!(f.probe.detect(), RuntimeEnvironment::Container);
    }

    #[test]
    fn test_in_host_namespace() {
        assert!(RuntimeEnvironment::Host.in_host_namespace());
        assert!(!RuntimeEnvironment::Container.in_host_namespace());
    }

    #[test]
    fn test_host_rootfs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            RuntimeEnvironment::Host.host_rootfs(dir.path()).unwrap(),
            Path::new("/")
        );
        assert_eq!(
            RuntimeEnvironment::Container
                .host_rootfs(dir.path())
                .unwrap(),
            dir.path()
        );

        let missing = dir.path().join("rootfs");
        let err = RuntimeEnvironment::Container
            .host_rootfs(&missing)
            .unwrap_err();
        assert!(matches!(err, Error::MissingHostRoot { path } if path == missing));
    }
}
