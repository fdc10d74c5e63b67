//! Access-control groups for the workload and the filesystem
//!
//! Every inbound flow is listed explicitly. A self rule, a network rule and a
//! management rule on the same port are three rules; none implies another.

use fargate_console_models::{AccessGroup, AccessRule, AllowlistEntry, Peer, Protocol};
use ipnet::Ipv4Net;

use crate::error::PlanError;
use crate::names::ResourceNames;
use crate::network::NetworkContext;

/// Ports exposed by the stack
pub mod ports {
    pub const HTTP: u16 = 80;
    pub const POSTGRES: u16 = 5432;
    pub const CONSOLE: u16 = 8080;
    pub const MONITORING_PROMETHEUS: u16 = 9090;
    pub const MONITORING_ALERTMANAGER: u16 = 9010;
    pub const MONITORING_CORTEX: u16 = 9009;
    /// Opened between members only; no container maps it
    pub const MONITORING_RESERVED: u16 = 9095;
    pub const NFS: u16 = 2049;

    pub const MONITORING: [u16; 4] = [
        MONITORING_PROMETHEUS,
        MONITORING_ALERTMANAGER,
        MONITORING_CORTEX,
        MONITORING_RESERVED,
    ];
}

/// Group shared by every container of the workload
pub fn workload_access_group(
    names: &ResourceNames,
    network: &NetworkContext,
    management_cidr: Ipv4Net,
    allowlist: &[AllowlistEntry],
) -> AccessGroup {
    let local = Peer::Cidr(network.cidr);
    let management = Peer::Cidr(management_cidr);

    let mut group = AccessGroup::new(
        names.access_group(),
        format!("Access to the {} workload", names.prefix()),
        network.network_id.clone(),
    );

    let tcp = [
        (local.clone(), ports::HTTP, "HTTP from local network"),
        (Peer::SelfRef, ports::POSTGRES, "PostgreSQL from group members"),
        (local.clone(), ports::POSTGRES, "PostgreSQL from local network"),
        (management.clone(), ports::POSTGRES, "PostgreSQL from management network"),
        (local.clone(), ports::CONSOLE, "Console from local network"),
        (management.clone(), ports::CONSOLE, "Console from management network"),
    ];
    for (peer, port, description) in tcp {
        group.allow(AccessRule::tcp(peer, port, description));
    }

    for port in ports::MONITORING {
        group.allow(AccessRule::tcp(
            Peer::SelfRef,
            port,
            format!("Monitoring {port} from group members"),
        ));
    }

    group
        .allow(AccessRule::icmp(local, "ICMP from local network"))
        .allow(AccessRule::icmp(management, "ICMP from management network"));

    for entry in allowlist {
        group.allow(AccessRule::tcp(
            Peer::Cidr(entry.address),
            ports::CONSOLE,
            format!("Console from {}", entry.description),
        ));
    }

    group
}

/// Group in front of the filesystem mount targets
pub fn storage_access_group(names: &ResourceNames, network: &NetworkContext) -> AccessGroup {
    let mut group = AccessGroup::new(
        names.storage_access_group(),
        format!("NFS access to the {} filesystem", names.prefix()),
        network.network_id.clone(),
    );

    group
        .allow(AccessRule::tcp(
            Peer::Group(names.access_group()),
            ports::NFS,
            "NFS from workload group",
        ))
        .allow(AccessRule::tcp(Peer::Cidr(network.cidr), ports::NFS, "NFS from local network"));

    group
}

/// Reject any rule outside the flows this stack declares
pub fn validate_group(group: &AccessGroup, allowed_tcp_ports: &[u16]) -> Result<(), PlanError> {
    for rule in group.ingress() {
        let broad = match rule.protocol {
            Protocol::Tcp => rule
                .single_port()
                .map_or(true, |port| !allowed_tcp_ports.contains(&port)),
            Protocol::Icmp => false,
            Protocol::Udp | Protocol::All => true,
        };

        if broad || rule.is_wildcard() {
            return Err(PlanError::BroadRule {
                group: group.name.clone(),
                rule: rule.to_string(),
            });
        }
    }

    Ok(())
}

/// TCP ports the workload group may open
pub fn workload_ports() -> Vec<u16> {
    let mut allowed = vec![ports::HTTP, ports::POSTGRES, ports::CONSOLE];
    allowed.extend(ports::MONITORING);
    allowed
}
