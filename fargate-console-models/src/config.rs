//! Stack input configuration

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use ipnet::Ipv4Net;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::RemovalPolicy;

/// Management network allowed to reach the database and console ports
pub const DEFAULT_MANAGEMENT_CIDR: &str = "172.16.0.0/12";

/// Memory choices (MiB) for the smallest task size
const QUARTER_CPU_MEMORY: &[u32] = &[512, 1024, 2048];

/// Allowed memory (MiB) per Fargate CPU size: (cpu, min, max, step)
const FARGATE_SIZES: &[(u32, u32, u32, u32)] = &[
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122880, 8192),
];

/// The console health check URL is built from this path inside a shell probe
static HEALTH_CHECK_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/[A-Za-z0-9/_.\-]*$").expect("health check path pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required option '{0}' is empty")]
    MissingField(&'static str),

    #[error("option '{field}' has invalid value '{value}' (lowercase letters, digits and '-' only)")]
    InvalidName { field: &'static str, value: String },

    #[error("cpu units {0} is not a supported task size")]
    UnsupportedCpu(u32),

    #[error("memory limit {memory} MiB is not valid for {cpu} cpu units")]
    MemoryOutOfRange { cpu: u32, memory: u32 },

    #[error("health check path '{0}' must be '/' followed by letters, digits or '/_.-'")]
    InvalidHealthCheckPath(String),

    #[error("target group priority {0} must be between 1 and 50000")]
    InvalidTargetGroupPriority(u32),

    #[error("allowlist entry {0} has no description")]
    AllowlistDescription(Ipv4Net),

    #[error("failed to read stack config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stack config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One extra network allowed to reach the console
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowlistEntry {
    pub address: Ipv4Net,
    pub description: String,
}

/// Input for one stack deployment
///
/// Immutable once a plan has been computed from it. All derived resource names
/// come from [`StackConfig::resource_prefix`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    pub project: String,
    pub service: String,
    pub environment: String,
    pub domain: String,
    pub subdomain: String,
    pub network_id: String,
    /// Task memory in MiB
    pub memory_limit: u32,
    pub cpu_units: u32,
    pub desired_count: u32,
    #[serde(default)]
    pub allowlist: Vec<AllowlistEntry>,
    #[serde(default)]
    pub target_group_priority: Option<u32>,
    pub health_check_path: String,
    #[serde(default = "default_management_cidr")]
    pub management_cidr: Ipv4Net,
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

fn default_management_cidr() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(172, 16, 0, 0), 12).unwrap_or_default()
}

impl StackConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// `{environment}-{project}-{service}`
    pub fn resource_prefix(&self) -> String {
        format!("{}-{}-{}", self.environment, self.project, self.service)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("environment", &self.environment),
            ("project", &self.project),
            ("service", &self.service),
        ] {
            validate_name(field, value)?;
        }

        for (field, value) in [
            ("domain", &self.domain),
            ("subdomain", &self.subdomain),
            ("networkId", &self.network_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field));
            }
        }

        validate_task_size(self.cpu_units, self.memory_limit)?;

        if !HEALTH_CHECK_PATH.is_match(&self.health_check_path) {
            return Err(ConfigError::InvalidHealthCheckPath(
                self.health_check_path.clone(),
            ));
        }

        if let Some(priority) = self.target_group_priority {
            if !(1..=50_000).contains(&priority) {
                return Err(ConfigError::InvalidTargetGroupPriority(priority));
            }
        }

        if let Some(entry) = self
            .allowlist
            .iter()
            .find(|entry| entry.description.trim().is_empty())
        {
            return Err(ConfigError::AllowlistDescription(entry.address));
        }

        Ok(())
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingField(field));
    }

    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

/// Check a cpu/memory pair against the supported task sizes
pub fn validate_task_size(cpu: u32, memory: u32) -> Result<(), ConfigError> {
    if cpu == 256 {
        return if QUARTER_CPU_MEMORY.contains(&memory) {
            Ok(())
        } else {
            Err(ConfigError::MemoryOutOfRange { cpu, memory })
        };
    }

    let (_, min, max, step) = FARGATE_SIZES
        .iter()
        .find(|(size, ..)| *size == cpu)
        .ok_or(ConfigError::UnsupportedCpu(cpu))?;

    if memory < *min || memory > *max || (memory - min) % step != 0 {
        return Err(ConfigError::MemoryOutOfRange { cpu, memory });
    }

    Ok(())
}
