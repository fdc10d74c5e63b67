//! Shared network filesystem records

use serde::{Deserialize, Serialize};

use crate::RemovalPolicy;

/// Encrypted network filesystem scoped to a set of subnets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSystemSpec {
    pub name: String,
    pub encrypted: bool,
    /// One mount target per subnet
    pub subnet_ids: Vec<String>,
    pub access_group: String,
    pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PosixOwnership {
    pub uid: u32,
    pub gid: u32,
}

/// Fixed-identity view into a filesystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPointSpec {
    pub name: String,
    pub file_system: String,
    pub root_path: String,
    /// Ownership applied to every file written through the access point
    pub owner: PosixOwnership,
    /// Octal permission bits for the root directory, e.g. `"755"`
    pub permissions: String,
}

/// The volume a workload mounts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageVolume {
    pub name: String,
    pub file_system_id: String,
    pub access_point_id: String,
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub permission_bits: String,
    /// Encryption at rest
    pub encrypted: bool,
    /// Encryption between task and mount target
    pub transit_encryption: bool,
}
