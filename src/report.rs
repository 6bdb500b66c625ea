//! The JSON report printed by the binary.
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::container::DiscoverySource;
use crate::environment::RuntimeEnvironment;
use crate::error::{ResultOkLogExt, error_chain};
use crate::fs::Filesystem;
use crate::handler::ContainerHandler;
use crate::machine::{MachineInfo, MachineInfoFactory};
use crate::registry::Registry;

#[derive(Debug, Serialize)]
pub struct Report {
    pub environment: RuntimeEnvironment,
    pub machine: Option<MachineInfo>,
    pub containers: Vec<ContainerReport>,
    /// Diagnostics of every registered factory.
    pub diagnostics: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Handled,
    Ignored,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct ContainerReport {
    pub name: String,
    pub status: ContainerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a handler sees of its container.
#[derive(Debug, Serialize)]
pub struct HandlerReport {
    pub cgroup_paths: BTreeMap<String, PathBuf>,
    pub root_fs: PathBuf,
    pub exists: bool,
    pub subcontainers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filesystems: Vec<Filesystem>,
}

impl HandlerReport {
    pub fn from_handler(handler: &dyn ContainerHandler) -> Self {
        Self {
            cgroup_paths: handler.cgroup_paths().clone(),
            root_fs: handler.root_fs().to_path_buf(),
            exists: handler.exists(),
            subcontainers: handler
                .list_containers(false)
                .ok_log()
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect(),
            filesystems: handler.filesystems().ok_log().unwrap_or_default(),
        }
    }
}

/// Asks the raw discovery factories for a handler for `name` and describes the outcome.
///
/// The handler is cleaned up once described.
pub fn evaluate(registry: &Registry, name: &str, in_host_namespace: bool) -> ContainerReport {
    let (report, handler) = describe(registry, name, in_host_namespace);
    if let Some(handler) = handler {
        handler.cleanup();
    }
    report
}

/// Like [`evaluate`], but hands the live handler back to the caller.
fn describe(
    registry: &Registry,
    name: &str,
    in_host_namespace: bool,
) -> (ContainerReport, Option<Box<dyn ContainerHandler>>) {
    let (status, handler, error) =
        match registry.new_container_handler(name, DiscoverySource::Raw, in_host_namespace) {
            Ok(Some(handler)) => (ContainerStatus::Handled, Some(handler), None),
            Ok(None) => (ContainerStatus::Ignored, None, None),
            Err(err) => {
                log::warn!("failed to create handler for `{}`: {}", name, err);
                (ContainerStatus::Failed, None, Some(error_chain(&err)))
            }
        };

    let report = ContainerReport {
        name: name.to_owned(),
        status,
        handler: handler.as_deref().map(HandlerReport::from_handler),
        error,
    };
    (report, handler)
}

/// Evaluates every name and snapshots the factory diagnostics while the handlers
/// are still alive. The handlers are cleaned up afterwards.
pub fn build(
    registry: &Registry,
    names: &[String],
    environment: RuntimeEnvironment,
    machine_info_factory: &dyn MachineInfoFactory,
) -> Report {
    let (containers, handlers): (Vec<_>, Vec<_>) = names
        .iter()
        .map(|name| describe(registry, name, environment.in_host_namespace()))
        .unzip();
    let diagnostics = registry.debug_info();
    for handler in handlers.into_iter().flatten() {
        handler.cleanup();
    }

    Report {
        environment,
        machine: machine_info_factory.machine_info().ok_log(),
        containers,
        diagnostics,
    }
}
