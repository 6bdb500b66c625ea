//! Fake collaborators shared by the unit tests.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::fs::{Filesystem, FsInfo};
use crate::machine::{self, MachineInfo, MachineInfoFactory};
use crate::mountinfo;
use crate::watcher::table::WatchTable;
use crate::watcher::{self, ChangeWatcher, WatchSet};

#[derive(Debug)]
pub struct FakeMachineInfoFactory;

impl MachineInfoFactory for FakeMachineInfoFactory {
    fn machine_info(&self) -> machine::Result<MachineInfo> {
        Ok(MachineInfo {
            machine_id: "0123456789abcdef0123456789abcdef".parse()?,
            hostname: "test-host".to_owned(),
        })
    }
}

#[derive(Debug)]
pub struct FakeFsInfo;

impl FsInfo for FakeFsInfo {
    fn filesystems(&self) -> mountinfo::Result<Vec<Filesystem>> {
        Ok(vec![Filesystem {
            device: "/dev/sda1".to_owned(),
            major_minor: "8:1".to_owned(),
            mount_point: PathBuf::from("/"),
            fs_type: "ext4".to_owned(),
        }])
    }
}

/// An in-memory [`ChangeWatcher`] with the same bookkeeping as the inotify one,
/// that can be told to reject directories.
#[derive(Debug, Default)]
pub struct RecordingWatcher {
    table: Mutex<WatchTable<()>>,
    failing: Mutex<Vec<PathBuf>>,
}

impl RecordingWatcher {
    pub fn fail_on(&self, dir: impl Into<PathBuf>) {
        self.failing.lock().unwrap().push(dir.into());
    }
}

impl ChangeWatcher for RecordingWatcher {
    fn add_watch(&self, container: &str, dir: &Path) -> watcher::Result<bool> {
        let failing = self.failing.lock().unwrap().iter().any(|failing| failing == dir);
        self.table.lock().unwrap().add(container, dir, |_| {
            if failing {
                Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            } else {
                Ok(())
            }
        })
    }

    fn remove_watch(&self, container: &str, dir: &Path) -> watcher::Result<bool> {
        self.table.lock().unwrap().remove(container, dir, |()| Ok(()))
    }

    fn current_watches(&self) -> WatchSet {
        self.table.lock().unwrap().snapshot()
    }
}
