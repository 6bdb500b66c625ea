use std::path::PathBuf;

use crate::{fsutil, mountinfo};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read mount table: {0}")]
    MountInfo(#[from] mountinfo::Error),
    #[error("failed to read controllers of cgroup2 mount `{path}`: {source}")]
    Controllers {
        path: PathBuf,
        #[source]
        source: fsutil::FileError,
    },
    #[error("failed to find cgroup mounts in `{path}`")]
    MissingCgroupMounts { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
