//! Network lookup
//!
//! The network is owned elsewhere; the plan builder only reads it through a
//! [`NetworkLookup`] handed to it by the caller.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    pub cidr: Ipv4Net,
    #[serde(default)]
    pub availability_zone: Option<String>,
}

/// Resolved view of an existing network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkContext {
    pub network_id: String,
    pub cidr: Ipv4Net,
    pub private_subnets: Vec<Subnet>,
}

impl NetworkContext {
    pub fn subnet_ids(&self) -> Vec<String> {
        self.private_subnets.iter().map(|s| s.id.clone()).collect()
    }
}

/// Read-only access to existing networks
pub trait NetworkLookup: Send + Sync {
    /// Resolve `network_id`; fails with [`PlanError::NetworkNotFound`]
    fn resolve(&self, network_id: &str) -> Result<NetworkContext, PlanError>;
}

#[derive(Debug, Clone, Deserialize)]
struct NetworkEntry {
    cidr: Ipv4Net,
    #[serde(default)]
    private_subnets: Vec<Subnet>,
}

/// Networks known up front, e.g. loaded from a fixture file
#[derive(Debug, Clone, Default)]
pub struct StaticNetworks {
    networks: BTreeMap<String, NetworkContext>,
}

impl StaticNetworks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network: NetworkContext) -> Self {
        self.networks.insert(network.network_id.clone(), network);
        self
    }

    /// Parse `{network_id: {cidr, private_subnets: [...]}}`
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let entries: BTreeMap<String, NetworkEntry> =
            serde_yaml::from_str(yaml).context("Failed to parse network definitions")?;

        let networks = entries
            .into_iter()
            .map(|(network_id, entry)| {
                let context = NetworkContext {
                    network_id: network_id.clone(),
                    cidr: entry.cidr,
                    private_subnets: entry.private_subnets,
                };
                (network_id, context)
            })
            .collect();

        Ok(Self { networks })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network definitions {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }
}

impl NetworkLookup for StaticNetworks {
    fn resolve(&self, network_id: &str) -> Result<NetworkContext, PlanError> {
        let network = self
            .networks
            .get(network_id)
            .cloned()
            .ok_or_else(|| PlanError::NetworkNotFound(network_id.to_string()))?;

        if network.private_subnets.is_empty() {
            return Err(PlanError::NoPrivateSubnets(network_id.to_string()));
        }

        Ok(network)
    }
}
