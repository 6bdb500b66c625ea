use crate::{cgroup, handler, watcher};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get cgroup subsystems: {0}")]
    SubsystemDiscovery(#[source] cgroup::Error),
    #[error("failed to find supported cgroup mounts for the raw factory")]
    NoMounts,
    #[error("failed to create change watcher: {0}")]
    WatcherCreation(#[source] watcher::Error),
    #[error("failed to create handler for container `{name}`: {source}")]
    HandlerConstruction {
        name: String,
        #[source]
        source: handler::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
