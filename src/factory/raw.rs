use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AcceptanceDecision, AcceptancePolicy, ContainerHandlerFactory, Error, Result};
use crate::cgroup::{CgroupSubsystems, SubsystemDiscovery};
use crate::container::{DiscoverySource, MetricSet};
use crate::fs::FsInfo;
use crate::handler::{ContainerHandler, HandlerBuilder, HandlerContext};
use crate::machine::MachineInfoFactory;
use crate::registry::FactoryRegistry;
use crate::watcher::{self, ChangeWatcher, WatcherProvider};

pub const RAW_FACTORY_NAME: &str = "raw";

/// Where the host root is mounted when running in a separate mount namespace.
const DEFAULT_HOST_ROOTFS: &str = "/rootfs";

/// Settings of the raw factory, fixed at registration.
#[derive(Debug, Clone)]
pub struct RawFactoryConfig {
    /// Only accept the root container and whitelisted cgroups.
    pub docker_only: bool,
    /// Cgroup prefixes accepted even when `docker_only` is set.
    pub raw_prefix_whitelist: Vec<String>,
    pub included_metrics: MetricSet,
    /// The host root as seen from outside the host mount namespace.
    pub host_rootfs: PathBuf,
}

impl Default for RawFactoryConfig {
    fn default() -> Self {
        Self {
            docker_only: false,
            raw_prefix_whitelist: Vec::new(),
            included_metrics: MetricSet::all(),
            host_rootfs: PathBuf::from(DEFAULT_HOST_ROOTFS),
        }
    }
}

/// The services [`register`] builds the raw factory from.
pub struct Collaborators<'a> {
    pub machine_info_factory: Arc<dyn MachineInfoFactory>,
    pub fs_info: Arc<dyn FsInfo>,
    pub subsystem_discovery: &'a dyn SubsystemDiscovery,
    pub watcher_provider: &'a dyn WatcherProvider,
    pub handler_builder: Arc<dyn HandlerBuilder>,
    pub registry: &'a dyn FactoryRegistry,
}

/// The catch-all factory for plain cgroups.
#[derive(Debug)]
pub struct RawFactory {
    machine_info_factory: Arc<dyn MachineInfoFactory>,
    subsystems: CgroupSubsystems,
    fs_info: Arc<dyn FsInfo>,
    watcher: Arc<dyn ChangeWatcher>,
    included_metrics: MetricSet,
    policy: AcceptancePolicy,
    handler_builder: Arc<dyn HandlerBuilder>,
    host_rootfs: PathBuf,
}

impl RawFactory {
    /// Resolves the cgroup mounts and creates the watcher the factory shares with its
    /// handlers.
    ///
    /// # Errors
    ///
    /// - [`Error::SubsystemDiscovery`] if the cgroup mounts cannot be resolved.
    /// - [`Error::NoMounts`] if none of the mounted controllers is supported.
    /// - [`Error::WatcherCreation`] if the watcher cannot be created.
    pub fn new(config: RawFactoryConfig, collaborators: &Collaborators<'_>) -> Result<Self> {
        let subsystems = collaborators
            .subsystem_discovery
            .discover_mounts(&config.included_metrics)
            .map_err(Error::SubsystemDiscovery)?;
        if subsystems.is_empty() {
            return Err(Error::NoMounts);
        }

        let watcher = collaborators
            .watcher_provider
            .create_watcher()
            .map_err(Error::WatcherCreation)?;

        Ok(Self {
            machine_info_factory: Arc::clone(&collaborators.machine_info_factory),
            subsystems,
            fs_info: Arc::clone(&collaborators.fs_info),
            watcher,
            included_metrics: config.included_metrics,
            policy: AcceptancePolicy::new(config.docker_only, config.raw_prefix_whitelist),
            handler_builder: Arc::clone(&collaborators.handler_builder),
            host_rootfs: config.host_rootfs,
        })
    }

    pub fn subsystems(&self) -> &CgroupSubsystems {
        &self.subsystems
    }

    fn root_fs(&self, in_host_namespace: bool) -> &Path {
        if in_host_namespace {
            Path::new("/")
        } else {
            &self.host_rootfs
        }
    }
}

impl fmt::Display for RawFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(RAW_FACTORY_NAME)
    }
}

impl ContainerHandlerFactory for RawFactory {
    fn identify(&self) -> &str {
        RAW_FACTORY_NAME
    }

    fn can_handle_and_accept(&self, name: &str) -> AcceptanceDecision {
        self.policy.evaluate(name)
    }

    fn new_handler(
        &self,
        name: &str,
        in_host_namespace: bool,
    ) -> Result<Box<dyn ContainerHandler>> {
        self.handler_builder
            .build_handler(HandlerContext {
                name,
                subsystems: &self.subsystems,
                machine_info_factory: &self.machine_info_factory,
                fs_info: &self.fs_info,
                watcher: &self.watcher,
                root_fs: self.root_fs(in_host_namespace),
                included_metrics: &self.included_metrics,
            })
            .map_err(|source| Error::HandlerConstruction {
                name: name.to_owned(),
                source,
            })
    }

    fn debug_info(&self) -> BTreeMap<String, Vec<String>> {
        watcher::debug_info(&self.watcher.current_watches())
    }
}

/// Builds the raw factory and registers it for the [`DiscoverySource::Raw`] source.
///
/// Nothing is registered if any step fails; the failure is logged and returned.
///
/// # Errors
///
/// See [`RawFactory::new`].
pub fn register(config: RawFactoryConfig, collaborators: Collaborators<'_>) -> Result<()> {
    let factory = RawFactory::new(config, &collaborators).inspect_err(|err| {
        log::error!(target: "raw factory", "registration aborted: {err}");
    })?;

    log::info!(
        "Registering {} factory with {} cgroup controllers",
        factory,
        factory.subsystems().mount_points().len()
    );
    collaborators
        .registry
        .register_factory(Arc::new(factory), &[DiscoverySource::Raw]);
    Ok(())
}
