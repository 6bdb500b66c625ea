use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    File(#[from] fsutil::FileError),
    #[error("invalid machine id: {0}")]
    InvalidMachineID(String),
}

pub type Result<T> = std::result::Result<T, Error>;
