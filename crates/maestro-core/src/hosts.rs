//! Host registry.
//!
//! Hosts are produced exclusively by parsing the provisioning tool's output;
//! nothing in this system constructs them by hand. Lists from multiple stacks
//! are concatenation-merged in insertion order and never deduplicated — a
//! host reported by two stacks appears twice.

use serde::{Deserialize, Serialize};

/// A provisioned endpoint reported by the infrastructure-provisioning tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_domain: Option<String>,
}

/// Ordered aggregate of hosts across provisioning passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostList {
    #[serde(default)]
    pub hosts: Vec<Host>,
}

impl HostList {
    /// Append another list's hosts, preserving order.
    pub fn merge(&mut self, other: HostList) {
        self.hosts.extend(other.hosts);
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|h| h.hostname.as_str())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
