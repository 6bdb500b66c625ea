use std::path::PathBuf;

use crate::{container, machine, mountinfo, watcher};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] container::Error),
    #[error("failed to watch cgroup of container `{name}`: {source}")]
    Watch {
        name: String,
        #[source]
        source: watcher::Error,
    },
    #[error("failed to list subcontainers in `{path}`: {source}")]
    ListContainers {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to query filesystems: {0}")]
    Filesystems(#[from] mountinfo::Error),
    #[error("failed to query machine info: {0}")]
    MachineInfo(#[from] machine::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
