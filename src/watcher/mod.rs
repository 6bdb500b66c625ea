//! Tracking of the cgroup directories watched for container creation and removal.
//!
//! Handlers register the cgroup directories of their container with a shared
//! [`ChangeWatcher`]; factories only read snapshots of the resulting watch set to
//! report diagnostics.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

mod error;
mod inotify_watcher;
pub(crate) mod table;

pub use error::{Error, Result};
pub use inotify_watcher::InotifyWatcher;

/// The diagnostics category under which watched paths are reported.
pub const WATCHES_DEBUG_KEY: &str = "Inotify watches";

/// A snapshot of watched paths, keyed by container name.
pub type WatchSet = BTreeMap<String, Vec<String>>;

/// A shared set of watched directories, grouped by the container that asked for them.
pub trait ChangeWatcher: fmt::Debug + Send + Sync {
    /// Adds a watch on `dir` for `container`.
    ///
    /// Returns whether the container was already being watched.
    fn add_watch(&self, container: &str, dir: &Path) -> Result<bool>;

    /// Removes the watch on `dir` for `container`.
    ///
    /// Returns whether this was the last watch of the container.
    fn remove_watch(&self, container: &str, dir: &Path) -> Result<bool>;

    /// Returns a point-in-time copy of the watched directories of every container.
    fn current_watches(&self) -> WatchSet;
}

/// Capability to create the [`ChangeWatcher`] a factory shares with its handlers.
pub trait WatcherProvider {
    fn create_watcher(&self) -> Result<Arc<dyn ChangeWatcher>>;
}

impl<F> WatcherProvider for F
where
    F: Fn() -> Result<Arc<dyn ChangeWatcher>>,
{
    fn create_watcher(&self) -> Result<Arc<dyn ChangeWatcher>> {
        self()
    }
}

/// Provides [`InotifyWatcher`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct InotifyWatcherProvider;

impl WatcherProvider for InotifyWatcherProvider {
    fn create_watcher(&self) -> Result<Arc<dyn ChangeWatcher>> {
        Ok(Arc::new(InotifyWatcher::new()?))
    }
}

/// Formats a watch set for diagnostics.
///
/// Every container contributes a `<name>:` line followed by one tab-indented line
/// per watched directory.
pub fn debug_info(watches: &WatchSet) -> BTreeMap<String, Vec<String>> {
    let mut lines = Vec::with_capacity(watches.values().map(|dirs| dirs.len() + 1).sum());
    for (container, dirs) in watches {
        lines.push(format!("{container}:"));
        lines.extend(dirs.iter().map(|dir| format!("\t{dir}")));
    }
    BTreeMap::from([(WATCHES_DEBUG_KEY.to_owned(), lines)])
}
