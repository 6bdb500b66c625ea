use std::fs;
use std::io::BufRead;
use std::path::Path;

use super::{Error, Result};
use crate::fsutil;

const CONTAINER_CGROUP_MARKERS: &[&str] = &["docker", "kubepods", "containerd", "libpod"];

/// Returns true if `<rootfs>/proc` exists.
///
/// # Errors
///
/// Returns [`Error::ExistenceCheck`] if the existence of the directory cannot be determined.
pub fn contains_proc_mount(rootfs: &Path) -> Result<bool> {
    let path = rootfs.join("proc");

    path.try_exists()
        .map_err(|source| Error::ExistenceCheck { path, source })
}

/// Returns true if the pid namespace of this process differs from the one of the
/// init process under `rootfs`.
///
/// `proc_root` is the procfs of this process, normally `/proc`.
///
/// # Errors
///
/// Returns [`Error::ReadSymlink`] if either namespace link cannot be read.
pub fn is_pid_namespace_isolated(proc_root: &Path, rootfs: &Path) -> Result<bool> {
    let read_ns = |path: &Path| {
        fs::read_link(path).map_err(|source| Error::ReadSymlink {
            path: path.to_path_buf(),
            source,
        })
    };

    let self_ns = read_ns(&proc_root.join("self/ns/pid"))?;
    let init_ns = read_ns(&rootfs.join("proc/1/ns/pid"))?;

    Ok(self_ns != init_ns)
}

/// Returns true if a cgroup membership file (`/proc/self/cgroup`) names a runtime
/// or contains a container ID.
///
/// # Errors
///
/// * [`Error::File`] if the file cannot be opened.
/// * [`Error::ReadLine`] if a line cannot be read.
pub fn matches_container_cgroup(cgroup_file: &Path) -> Result<bool> {
    let mut buf = fsutil::open_file_reader(cgroup_file)?;
    let mut line = String::with_capacity(256);

    while buf.read_line(&mut line).map_err(|source| Error::ReadLine {
        path: cgroup_file.to_path_buf(),
        source,
    })? != 0
    {
        let path = line.trim_end().rsplit(':').next().unwrap_or_default();
        if CONTAINER_CGROUP_MARKERS
            .iter()
            .any(|marker| path.contains(marker))
            || path.split('/').any(is_container_id)
        {
            return Ok(true);
        }

        line.clear();
    }

    Ok(false)
}

/// Returns true if marker files under `root` or the `container` environment variable
/// indicate a container.
pub fn has_container_indicators(root: &Path) -> bool {
    root.join(".dockerenv").exists()
        || root.join("run/.containerenv").exists()
        || std::env::var_os("container").is_some()
}

/// Returns true for path segments that look like runtime container IDs, optionally
/// wrapped as systemd scopes (`docker-<id>.scope`).
fn is_container_id(segment: &str) -> bool {
    let id = segment
        .strip_suffix(".scope")
        .and_then(|scope| scope.rsplit('-').next())
        .unwrap_or(segment);
    id.len() >= 32 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "3f1c9e0b8a7d6c5b4a39281706f5e4d3c2b1a09f8e7d6c5b4a3928170f6e5d4c";

    fn cgroup_file(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_is_container_id() {
        assert!(is_container_id(ID));
        assert!(is_container_id(&format!("docker-{ID}.scope")));
        assert!(!is_container_id("deadbeef"));
        assert!(!is_container_id("user.slice"));
        assert!(!is_container_id(""));
    }

    #[test]
    fn test_matches_container_cgroup_v2() {
        let file = cgroup_file(&format!("0::/system.slice/docker-{ID}.scope\n"));
        assert!(matches_container_cgroup(file.path()).unwrap());

        let file = cgroup_file("0::/user.slice/user-1000.slice/session-2.scope\n");
        assert!(!matches_container_cgroup(file.path()).unwrap());
    }

    #[test]
    fn test_matches_container_cgroup_v1() {
        let file = cgroup_file(
            "12:pids:/\n11:cpu,cpuacct:/kubepods/besteffort/pod1\n1:name=systemd:/init.scope\n",
        );
        assert!(matches_container_cgroup(file.path()).unwrap());
    }

    #[test]
    fn test_matches_container_cgroup_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = matches_container_cgroup(&dir.path().join("cgroup")).unwrap_err();
        assert!(matches!(err, Error::File(_)));
    }

    #[test]
    fn test_contains_proc_mount() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!contains_proc_mount(dir.path()).unwrap());
        fs::create_dir(dir.path().join("proc")).unwrap();
        assert!(contains_proc_mount(dir.path()).unwrap());
    }

    #[test]
    fn test_pid_namespace_isolation() {
        let proc_root = tempfile::tempdir().unwrap();
        let rootfs = tempfile::tempdir().unwrap();
        fs::create_dir_all(proc_root.path().join("self/ns")).unwrap();
        fs::create_dir_all(rootfs.path().join("proc/1/ns")).unwrap();
        std::os::unix::fs::symlink("pid:[4026531836]", proc_root.path().join("self/ns/pid"))
            .unwrap();

        let init_ns = rootfs.path().join("proc/1/ns/pid");
        std::os::unix::fs::symlink("pid:[4026531836]", &init_ns).unwrap();
        assert!(!is_pid_namespace_isolated(proc_root.path(), rootfs.path()).unwrap());

        fs::remove_file(&init_ns).unwrap();
        std::os::unix::fs::symlink("pid:[4026532210]", &init_ns).unwrap();
        assert!(is_pid_namespace_isolated(proc_root.path(), rootfs.path()).unwrap());
    }

    #[test]
    fn test_pid_namespace_missing_link() {
        let dir = tempfile::tempdir().unwrap();
        let err = is_pid_namespace_isolated(dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::ReadSymlink { .. }));
    }

    #[test]
    fn test_container_marker_files() {
        let dir = tempfile::tempdir().unwrap();
        if std::env::var_os("container").is_none() {
            assert!(!has_container_indicators(dir.path()));
        }
        fs::write(dir.path().join(".dockerenv"), "").unwrap();
        assert!(has_container_indicators(dir.path()));
    }
}
