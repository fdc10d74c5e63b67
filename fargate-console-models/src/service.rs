//! Running service records

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a service lives: the only handle scale actions get
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceAddress {
    pub cluster: String,
    pub service: String,
}

impl ServiceAddress {
    pub fn new(cluster: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service/{}/{}", self.cluster, self.service)
    }
}

/// A running, scalable instantiation of a workload definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInstance {
    pub name: String,
    pub address: ServiceAddress,
    pub workload_family: String,
    pub access_groups: Vec<String>,
    pub subnet_ids: Vec<String>,
    pub desired_count: u32,
    pub assign_public_ip: bool,
    /// Failed health probes inside this window do not replace the task
    pub health_check_grace_period_seconds: u32,
    /// Filesystem whose mount targets must exist before the service starts
    pub file_system: String,
}
