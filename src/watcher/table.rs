use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::{Error, Result, WatchSet};

/// Bookkeeping of which container watches which directory.
///
/// Every `(container, dir)` pair is reference counted, so several handlers of the
/// same container each hold their own reference. A directory watched by several
/// containers holds a single descriptor, released with the last container.
#[derive(Debug)]
pub(crate) struct WatchTable<D> {
    containers: HashMap<String, BTreeMap<PathBuf, usize>>,
    dirs: HashMap<PathBuf, (D, usize)>,
}

impl<D> Default for WatchTable<D> {
    fn default() -> Self {
        Self {
            containers: HashMap::new(),
            dirs: HashMap::new(),
        }
    }
}

impl<D> WatchTable<D> {
    /// Adds a reference to `dir` for `container`, calling `watch` if no container
    /// watches `dir` yet.
    ///
    /// Returns whether the container already had any watch.
    pub(crate) fn add(
        &mut self,
        container: &str,
        dir: &Path,
        watch: impl FnOnce(&Path) -> std::io::Result<D>,
    ) -> Result<bool> {
        let already_watched = self.containers.contains_key(container);
        if let Some(refs) = self
            .containers
            .get_mut(container)
            .and_then(|dirs| dirs.get_mut(dir))
        {
            *refs += 1;
            return Ok(already_watched);
        }

        match self.dirs.get_mut(dir) {
            Some((_, containers)) => *containers += 1,
            None => {
                let descriptor = watch(dir).map_err(|source| Error::AddWatch {
                    path: dir.to_path_buf(),
                    source,
                })?;
                self.dirs.insert(dir.to_path_buf(), (descriptor, 1));
            }
        }

        self.containers
            .entry(container.to_owned())
            .or_default()
            .insert(dir.to_path_buf(), 1);
        Ok(already_watched)
    }

    /// Drops one reference to `dir` held by `container`, calling `unwatch` once no
    /// container watches `dir` any more.
    ///
    /// Returns whether the container has no watches left.
    pub(crate) fn remove(
        &mut self,
        container: &str,
        dir: &Path,
        unwatch: impl FnOnce(D) -> std::io::Result<()>,
    ) -> Result<bool> {
        let Some(dirs) = self.containers.get_mut(container) else {
            return Ok(false);
        };

        let mut released = Ok(());
        if let Some(refs) = dirs.get_mut(dir) {
            *refs -= 1;
            if *refs == 0 {
                dirs.remove(dir);
                if let Entry::Occupied(mut entry) = self.dirs.entry(dir.to_path_buf()) {
                    entry.get_mut().1 -= 1;
                    if entry.get().1 == 0 {
                        let (descriptor, _) = entry.remove();
                        released = release(dir, unwatch(descriptor));
                    }
                }
            }
        }

        let last = dirs.is_empty();
        if last {
            self.containers.remove(container);
        }
        released.map(|()| last)
    }

    pub(crate) fn snapshot(&self) -> WatchSet {
        self.containers
            .iter()
            .map(|(container, dirs)| {
                (
                    container.clone(),
                    dirs.keys().map(|dir| dir.display().to_string()).collect(),
                )
            })
            .collect()
    }

    pub(crate) fn container_count(&self) -> usize {
        self.containers.len()
    }
}

/// The kernel drops the watch of a deleted directory on its own, so removing it
/// afterwards fails with `EINVAL`.
fn release(dir: &Path, result: std::io::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => {
            log::debug!("watch on `{}` was already gone", dir.display());
            Ok(())
        }
        Err(source) => Err(Error::RemoveWatch {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
