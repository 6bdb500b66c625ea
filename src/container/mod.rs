//! Identifiers shared by every discovery strategy: container names, metric kinds and
//! discovery sources.
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;
mod metrics;

pub use error::{Error, Result};
pub use metrics::{MetricKind, MetricSet};

/// The name of the root container, i.e. the topmost cgroup.
pub const ROOT_CONTAINER: &str = "/";

/// The maximum allowed length for a [`ContainerName`], matching `PATH_MAX`.
const CONTAINER_NAME_MAX_LEN: usize = 4096;

/// A validated container name.
///
/// Container names are cgroup paths relative to the cgroup root, e.g. `/` for the
/// root container or `/system.slice/sshd.service`.
///
/// # Examples
///
/// ```
/// # use creo_discovery::container::ContainerName;
/// let name = ContainerName::new("/docker/abc123").unwrap();
/// assert_eq!(name.as_ref(), "/docker/abc123");
/// assert!(!name.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerName(Arc<str>);

impl ContainerName {
    /// Creates a new `ContainerName` from the given raw name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerName`] if the name is not absolute, contains a NUL
    /// byte, or exceeds [`CONTAINER_NAME_MAX_LEN`] bytes.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if !src.starts_with('/') || src.contains('\0') || src.len() > CONTAINER_NAME_MAX_LEN {
            return Err(Error::InvalidContainerName(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// The root container name.
    pub fn root() -> Self {
        Self(ROOT_CONTAINER.into())
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == ROOT_CONTAINER
    }

    /// Returns the name of a direct child of this container.
    pub fn child(&self, segment: &str) -> Result<Self> {
        if self.is_root() {
            Self::new(format!("/{segment}"))
        } else {
            Self::new(format!("{}/{segment}", self.0))
        }
    }
}

impl AsRef<str> for ContainerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies which watch source a factory serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Plain cgroup hierarchy watching; served by the catch-all raw factory.
    Raw,
    /// Container runtime event streams.
    Runtime,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySource::Raw => f.write_str("raw"),
            DiscoverySource::Runtime => f.write_str("runtime"),
        }
    }
}
