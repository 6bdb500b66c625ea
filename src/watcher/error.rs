use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to initialize inotify: {0}")]
    Init(#[source] std::io::Error),
    #[error("failed to watch directory `{path}`: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove watch on directory `{path}`: {source}")]
    RemoveWatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
