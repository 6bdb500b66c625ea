use super::AcceptanceDecision;
use crate::container::ROOT_CONTAINER;

/// Decides which cgroups the raw factory claims.
///
/// The raw factory can handle every name. It accepts the root container always,
/// everything when not restricted to runtime-managed containers, and otherwise
/// only names starting with a whitelisted prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptancePolicy {
    docker_only: bool,
    prefix_whitelist: Vec<String>,
}

impl AcceptancePolicy {
    pub fn new(docker_only: bool, prefix_whitelist: Vec<String>) -> Self {
        Self {
            docker_only,
            prefix_whitelist,
        }
    }

    pub fn evaluate(&self, name: &str) -> AcceptanceDecision {
        let accept = name == ROOT_CONTAINER
            || !self.docker_only
            || self
                .prefix_whitelist
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()));

        AcceptanceDecision {
            can_handle: true,
            accept,
        }
    }
}
