//! Filesystem, access point and the volume the database mounts

use fargate_console_models::{
    AccessPointSpec, FileSystemSpec, PosixOwnership, RemovalPolicy, StorageVolume,
};

use crate::names::ResourceNames;
use crate::network::NetworkContext;

/// uid/gid of the postgres user in the database image
pub const DATABASE_OWNER: PosixOwnership = PosixOwnership { uid: 999, gid: 999 };

pub const ACCESS_POINT_ROOT: &str = "/postgres";

pub const ACCESS_POINT_PERMISSIONS: &str = "755";

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSubsystem {
    pub file_system: FileSystemSpec,
    pub access_point: AccessPointSpec,
    pub volume: StorageVolume,
}

/// Declare the storage subsystem
///
/// Removal is always destructive: no snapshot is kept when the stack goes away.
pub fn storage_subsystem(names: &ResourceNames, network: &NetworkContext) -> StorageSubsystem {
    let file_system = FileSystemSpec {
        name: names.file_system(),
        encrypted: true,
        subnet_ids: network.subnet_ids(),
        access_group: names.storage_access_group(),
        removal_policy: RemovalPolicy::Destroy,
    };

    let access_point = AccessPointSpec {
        name: names.access_point(),
        file_system: file_system.name.clone(),
        root_path: ACCESS_POINT_ROOT.to_string(),
        owner: DATABASE_OWNER,
        permissions: ACCESS_POINT_PERMISSIONS.to_string(),
    };

    let volume = StorageVolume {
        name: names.volume(),
        file_system_id: file_system.name.clone(),
        access_point_id: access_point.name.clone(),
        owner_uid: DATABASE_OWNER.uid,
        owner_gid: DATABASE_OWNER.gid,
        permission_bits: ACCESS_POINT_PERMISSIONS.to_string(),
        encrypted: file_system.encrypted,
        transit_encryption: true,
    };

    StorageSubsystem {
        file_system,
        access_point,
        volume,
    }
}
