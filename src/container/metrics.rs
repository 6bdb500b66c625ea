use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::Error;

/// A category of metrics a container handler may collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    CpuUsage,
    ProcessScheduler,
    PerCpuUsage,
    MemoryUsage,
    MemoryNuma,
    CpuLoad,
    DiskIo,
    DiskUsage,
    NetworkUsage,
    NetworkTcpUsage,
    NetworkAdvancedTcpUsage,
    NetworkUdpUsage,
    Accelerator,
    App,
    Process,
    HugetlbUsage,
    Perf,
    ReferencedMemory,
    CpuTopology,
    Resctrl,
    CpuSet,
    OomEvent,
}

impl MetricKind {
    pub const ALL: [MetricKind; 22] = [
        MetricKind::CpuUsage,
        MetricKind::ProcessScheduler,
        MetricKind::PerCpuUsage,
        MetricKind::MemoryUsage,
        MetricKind::MemoryNuma,
        MetricKind::CpuLoad,
        MetricKind::DiskIo,
        MetricKind::DiskUsage,
        MetricKind::NetworkUsage,
        MetricKind::NetworkTcpUsage,
        MetricKind::NetworkAdvancedTcpUsage,
        MetricKind::NetworkUdpUsage,
        MetricKind::Accelerator,
        MetricKind::App,
        MetricKind::Process,
        MetricKind::HugetlbUsage,
        MetricKind::Perf,
        MetricKind::ReferencedMemory,
        MetricKind::CpuTopology,
        MetricKind::Resctrl,
        MetricKind::CpuSet,
        MetricKind::OomEvent,
    ];

    /// The flag name of the metric kind, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CpuUsage => "cpu",
            MetricKind::ProcessScheduler => "sched",
            MetricKind::PerCpuUsage => "percpu",
            MetricKind::MemoryUsage => "memory",
            MetricKind::MemoryNuma => "memory_numa",
            MetricKind::CpuLoad => "cpuLoad",
            MetricKind::DiskIo => "diskIO",
            MetricKind::DiskUsage => "disk",
            MetricKind::NetworkUsage => "network",
            MetricKind::NetworkTcpUsage => "tcp",
            MetricKind::NetworkAdvancedTcpUsage => "advtcp",
            MetricKind::NetworkUdpUsage => "udp",
            MetricKind::Accelerator => "accelerator",
            MetricKind::App => "app",
            MetricKind::Process => "process",
            MetricKind::HugetlbUsage => "hugetlb",
            MetricKind::Perf => "perf_event",
            MetricKind::ReferencedMemory => "referenced_memory",
            MetricKind::CpuTopology => "cpu_topology",
            MetricKind::Resctrl => "resctrl",
            MetricKind::CpuSet => "cpuset",
            MetricKind::OomEvent => "oom_event",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownMetricKind(s.to_owned()))
    }
}

/// A set of metric kinds. Only membership is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSet(HashSet<MetricKind>);

impl MetricSet {
    /// Every known metric kind.
    pub fn all() -> Self {
        Self(MetricKind::ALL.into_iter().collect())
    }

    /// Every known metric kind except the given ones.
    pub fn all_except(disabled: &[MetricKind]) -> Self {
        Self(
            MetricKind::ALL
                .into_iter()
                .filter(|kind| !disabled.contains(kind))
                .collect(),
        )
    }

    pub fn has(&self, kind: MetricKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MetricKind> for MetricSet {
    fn from_iter<I: IntoIterator<Item = MetricKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
