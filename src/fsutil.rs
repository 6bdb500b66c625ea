use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening or reading a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} file `{path}`: {source}")]
pub struct FileError {
    pub op: FileOp,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The operation that failed on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Open,
    Read,
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOp::Open => f.write_str("open"),
            FileOp::Read => f.write_str("read"),
        }
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use creo_discovery::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileError {
        op: FileOp::Open,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads the whole file and returns its contents with surrounding whitespace removed.
///
/// Single-value files such as `/etc/hostname` or `cgroup.controllers` end in a newline.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map(|contents| contents.trim().to_owned())
        .map_err(|source| FileError {
            op: FileOp::Read,
            path: path.to_path_buf(),
            source,
        })
}
