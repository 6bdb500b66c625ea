//! Container handler factories: the pluggable strategies deciding which cgroups are
//! monitored as containers and how their handlers are built.
//!
//! # Key Components
//!
//! - [`ContainerHandlerFactory`]: The interface every discovery strategy implements.
//! - [`AcceptancePolicy`]: The raw factory's per-name acceptance rules.
//! - [`RawFactory`]: The catch-all strategy for plain cgroups, installed by [`register`].
use std::collections::BTreeMap;
use std::fmt;

mod error;
mod policy;
mod raw;

pub use error::{Error, Result};
pub use policy::AcceptancePolicy;
pub use raw::{Collaborators, RAW_FACTORY_NAME, RawFactory, RawFactoryConfig, register};

use crate::handler::ContainerHandler;

/// Whether a factory can build a handler for a name, and whether it wants to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AcceptanceDecision {
    /// The factory is structurally able to produce a handler for the name.
    pub can_handle: bool,
    /// The factory should be used for the name.
    pub accept: bool,
}

/// A discovery strategy.
///
/// Factories are immutable once registered and shared between threads.
pub trait ContainerHandlerFactory: fmt::Debug + Send + Sync {
    /// Name of the strategy, used in logs and diagnostics.
    fn identify(&self) -> &str;

    fn can_handle_and_accept(&self, name: &str) -> AcceptanceDecision;

    /// Builds a handler for `name`.
    ///
    /// `in_host_namespace` tells whether this process sees the host root at `/`.
    fn new_handler(&self, name: &str, in_host_namespace: bool)
    -> Result<Box<dyn ContainerHandler>>;

    /// Diagnostic listings, keyed by category.
    fn debug_info(&self) -> BTreeMap<String, Vec<String>>;
}
