//! Command line and environment configuration.
use std::path::PathBuf;

use clap::Parser;

use crate::container::{MetricKind, MetricSet};
use crate::factory::RawFactoryConfig;

/// Discovers the cgroups of this machine and reports which of them the raw factory
/// would monitor as containers.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Only report the root container and cgroups under a whitelisted prefix.
    #[arg(long, env = "DOCKER_ONLY")]
    pub docker_only: bool,

    /// Comma separated cgroup prefixes accepted even with `--docker-only`.
    #[arg(long, env = "RAW_CGROUP_PREFIX_WHITELIST", value_delimiter = ',')]
    pub raw_cgroup_prefix_whitelist: Vec<String>,

    /// Comma separated metric kinds not to collect, e.g. `diskIO,disk`.
    #[arg(long, env = "DISABLE_METRICS", value_delimiter = ',')]
    pub disable_metrics: Vec<MetricKind>,

    /// Mount point of the host root filesystem when running in a container.
    #[arg(long, env = "ROOTFS_MOUNT_PATH", default_value = "/rootfs")]
    pub rootfs: PathBuf,

    /// Mount table used to find the cgroup hierarchies and filesystems.
    #[arg(long, default_value = "/proc/self/mountinfo")]
    pub mountinfo: PathBuf,

    /// Cgroup names to evaluate.
    #[arg(default_value = "/")]
    pub names: Vec<String>,
}

impl Config {
    /// The non-empty whitelist prefixes. An empty prefix would match every name.
    pub fn prefix_whitelist(&self) -> Vec<String> {
        self.raw_cgroup_prefix_whitelist
            .iter()
            .filter(|prefix| {
                let keep = !prefix.is_empty();
                if !keep {
                    log::warn!("Ignoring empty raw cgroup prefix");
                }
                keep
            })
            .cloned()
            .collect()
    }

    pub fn included_metrics(&self) -> MetricSet {
        MetricSet::all_except(&self.disable_metrics)
    }

    pub fn raw_factory_config(&self) -> RawFactoryConfig {
        RawFactoryConfig {
            docker_only: self.docker_only,
            raw_prefix_whitelist: self.prefix_whitelist(),
            included_metrics: self.included_metrics(),
            host_rootfs: self.rootfs.clone(),
        }
    }
}
