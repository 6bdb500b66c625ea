#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container name: `{0}`")]
    InvalidContainerName(String),
    #[error("unknown metric kind: `{0}`")]
    UnknownMetricKind(String),
}
pub type Result<T> = std::result::Result<T, Error>;
