//! Container specification records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{RemovalPolicy, SecretRef};

/// Periodic check deciding whether a container is healthy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthProbe {
    /// Command in exec form, e.g. `["CMD-SHELL", "pg_isready"]`
    pub command: Vec<String>,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub retries: u32,
    /// Failures during this window do not count against `retries`
    pub start_period_seconds: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortMapping {
    pub name: String,
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: TransportProtocol,
}

impl PortMapping {
    pub fn tcp(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            container_port: port,
            host_port: port,
            protocol: TransportProtocol::Tcp,
        }
    }
}

/// State another container must reach before this one may start
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DependencyCondition {
    /// The dependency has been started
    Start,
    /// The dependency ran to completion, any exit code
    Complete,
    /// The dependency exited with code 0
    Success,
    /// The dependency's health probe passed
    Healthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupDependency {
    pub on_container: String,
    pub condition: DependencyCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountPoint {
    pub volume: String,
    pub container_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UlimitName {
    Nofile,
    Nproc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ulimit {
    pub name: UlimitName,
    pub soft_limit: u32,
    pub hard_limit: u32,
}

/// Dedicated log destination for one container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSink {
    pub group_name: String,
    pub stream_prefix: String,
    pub retention_days: u32,
    pub removal_policy: RemovalPolicy,
    /// Lines matching this pattern start a new record; others are appended
    pub multiline_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub cpu_share: u32,
    /// MiB
    pub memory_share: u32,
    pub environment: BTreeMap<String, String>,
    /// Environment variable name -> secret field
    pub secrets: BTreeMap<String, SecretRef>,
    pub health_probe: HealthProbe,
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
    #[serde(default)]
    pub ulimits: Vec<Ulimit>,
    pub log_sink: LogSink,
    #[serde(default)]
    pub startup_dependency: Option<StartupDependency>,
}

impl ContainerSpec {
    pub fn exposes(&self, port: u16) -> bool {
        self.ports.iter().any(|p| p.container_port == port)
    }

    pub fn container_ports(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.container_port).collect()
    }

    /// Image tag, `None` when the image is not pinned to one
    pub fn image_tag(&self) -> Option<&str> {
        let (repository, tag) = self.image.rsplit_once(':')?;
        // A colon inside a registry host:port is not a tag separator.
        if tag.contains('/') || repository.is_empty() {
            return None;
        }
        Some(tag)
    }
}
