use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use inotify::{Inotify, WatchDescriptor, WatchMask, Watches};

use super::table::WatchTable;
use super::{ChangeWatcher, Error, Result, WatchSet};

/// Subdirectory creation and removal is what signals containers coming and going.
const CGROUP_WATCH_MASK: WatchMask = WatchMask::CREATE
    .union(WatchMask::DELETE)
    .union(WatchMask::MOVE);

/// A [`ChangeWatcher`] backed by a single inotify instance.
pub struct InotifyWatcher {
    // Kept alive for the lifetime of the watches.
    _inotify: Inotify,
    state: Mutex<State>,
}

struct State {
    watches: Watches,
    table: WatchTable<WatchDescriptor>,
}

impl InotifyWatcher {
    /// Creates a new inotify instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if the kernel refuses a new instance, e.g. when
    /// `fs.inotify.max_user_instances` is exhausted.
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init().map_err(Error::Init)?;
        let watches = inotify.watches();
        Ok(Self {
            _inotify: inotify,
            state: Mutex::new(State {
                watches,
                table: WatchTable::default(),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChangeWatcher for InotifyWatcher {
    fn add_watch(&self, container: &str, dir: &Path) -> Result<bool> {
        let mut state = self.state();
        let State { watches, table } = &mut *state;
        let already_watched =
            table.add(container, dir, |dir| watches.add(dir, CGROUP_WATCH_MASK))?;
        log::trace!("watching `{}` for container {}", dir.display(), container);
        Ok(already_watched)
    }

    fn remove_watch(&self, container: &str, dir: &Path) -> Result<bool> {
        let mut state = self.state();
        let State { watches, table } = &mut *state;
        table.remove(container, dir, |descriptor| watches.remove(descriptor))
    }

    fn current_watches(&self) -> WatchSet {
        self.state().table.snapshot()
    }
}

impl fmt::Debug for InotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InotifyWatcher")
            .field("containers", &self.state().table.container_count())
            .finish()
    }
}
