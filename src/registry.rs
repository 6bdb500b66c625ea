//! The process-wide list of container handler factories.
use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::container::DiscoverySource;
use crate::factory::{self, ContainerHandlerFactory};
use crate::handler::ContainerHandler;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no known factory can handle creation of container `{name}`")]
    NoFactory { name: String },
    #[error(transparent)]
    Factory(#[from] factory::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Registration side of the factory registry.
pub trait FactoryRegistry {
    /// Appends `factory` to the factories of every source in `sources`.
    fn register_factory(
        &self,
        factory: Arc<dyn ContainerHandlerFactory>,
        sources: &[DiscoverySource],
    );
}

/// Factories per discovery source, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    factories: DashMap<DiscoverySource, Vec<Arc<dyn ContainerHandlerFactory>>>,
}

impl FactoryRegistry for Registry {
    fn register_factory(
        &self,
        factory: Arc<dyn ContainerHandlerFactory>,
        sources: &[DiscoverySource],
    ) {
        for source in sources {
            log::debug!(
                "registering factory {} for source {}",
                factory.identify(),
                source
            );
            self.factories
                .entry(*source)
                .or_default()
                .push(Arc::clone(&factory));
        }
    }
}

impl Registry {
    /// The factories registered for `source`, in registration order.
    pub fn factories(&self, source: DiscoverySource) -> Vec<Arc<dyn ContainerHandlerFactory>> {
        self.factories
            .get(&source)
            .map(|factories| factories.value().clone())
            .unwrap_or_default()
    }

    pub fn has_factories(&self) -> bool {
        self.factories.iter().any(|entry| !entry.value().is_empty())
    }

    /// Creates a handler for `name` with the first factory of `source` that can handle it.
    ///
    /// Returns `Ok(None)` if that factory does not accept the name; later factories
    /// are not consulted.
    ///
    /// # Errors
    ///
    /// - [`Error::NoFactory`] if no factory can handle the name.
    /// - [`Error::Factory`] if the chosen factory fails to build the handler.
    pub fn new_container_handler(
        &self,
        name: &str,
        source: DiscoverySource,
        in_host_namespace: bool,
    ) -> Result<Option<Box<dyn ContainerHandler>>> {
        // Cloned so no shard lock is held while factories build handlers.
        for factory in self.factories(source) {
            let decision = factory.can_handle_and_accept(name);
            if !decision.can_handle {
                continue;
            }
            if !decision.accept {
                log::debug!("factory {} ignored container {}", factory.identify(), name);
                return Ok(None);
            }
            log::debug!("using factory {} for container {}", factory.identify(), name);
            return Ok(Some(factory.new_handler(name, in_host_namespace)?));
        }

        Err(Error::NoFactory {
            name: name.to_owned(),
        })
    }

    /// Diagnostics of every registered factory, keyed by factory name.
    pub fn debug_info(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        let factories: Vec<_> = self
            .factories
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        factories
            .into_iter()
            .map(|factory| (factory.identify().to_owned(), factory.debug_info()))
            .collect()
    }
}
