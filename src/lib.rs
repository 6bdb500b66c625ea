//! Creo Discovery: decides which cgroups of a Linux host are monitored as
//! containers and builds the handlers that give access to them.
//!
//! The raw factory is the catch-all discovery strategy for plain cgroups. It is
//! registered once at startup from the cgroup controllers mounted on the host and
//! answers, for every cgroup name, whether it can and should be monitored.
use std::sync::Arc;

pub mod cgroup;
pub mod config;
pub mod container;
pub mod environment;
pub mod error;
pub mod factory;
pub mod fs;
pub mod fsutil;
pub mod handler;
pub mod machine;
pub mod mountinfo;
pub mod registry;
pub mod report;
pub mod watcher;

#[cfg(test)]
mod testutil;

use cgroup::MountInfoSubsystemDiscovery;
use config::Config;
use factory::Collaborators;
use fs::MountInfoFsInfo;
use handler::RawHandlerBuilder;
use machine::{MachineInfoFactory, RootfsMachineInfoFactory};
use registry::Registry;
use watcher::InotifyWatcherProvider;

/// Registers the raw factory for this host and evaluates the configured names.
///
/// # Errors
///
/// - The process runs in a container but the host root is not mounted at the
///   configured rootfs.
/// - The raw factory cannot be registered, e.g. because no supported cgroup
///   controller is mounted or inotify is unavailable.
pub fn run(config: &Config) -> Result<report::Report, Box<dyn std::error::Error>> {
    let environment = environment::detect_runtime_environment(&config.rootfs);
    let rootfs = environment.host_rootfs(&config.rootfs)?;
    log::debug!("Final rootfs: {}", rootfs.display());

    let registry = Registry::default();
    let machine_info_factory: Arc<dyn MachineInfoFactory> =
        Arc::new(RootfsMachineInfoFactory::new(rootfs));
    factory::register(
        config.raw_factory_config(),
        Collaborators {
            machine_info_factory: Arc::clone(&machine_info_factory),
            fs_info: Arc::new(MountInfoFsInfo::new(&config.mountinfo)),
            subsystem_discovery: &MountInfoSubsystemDiscovery::new(&config.mountinfo),
            watcher_provider: &InotifyWatcherProvider,
            handler_builder: Arc::new(RawHandlerBuilder),
            registry: &registry,
        },
    )?;

    Ok(report::build(
        &registry,
        &config.names,
        environment,
        machine_info_factory.as_ref(),
    ))
}
