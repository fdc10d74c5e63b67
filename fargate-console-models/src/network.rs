//! Access-control groups and their inbound rules

use std::fmt;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Where allowed traffic comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Peer {
    /// An address block
    Cidr(Ipv4Net),
    /// Members of the group the rule belongs to
    SelfRef,
    /// Members of another named group
    Group(String),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Cidr(net) => write!(f, "{net}"),
            Peer::SelfRef => write!(f, "self"),
            Peer::Group(name) => write!(f, "group:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Every protocol. Never emitted by the plan builder.
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PortSpec {
    Single { port: u16 },
    Range { from: u16, to: u16 },
    /// All ICMP types and codes
    AllIcmp,
    /// Every port of the protocol
    All,
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Single { port } => write!(f, "{port}"),
            PortSpec::Range { from, to } => write!(f, "{from}-{to}"),
            PortSpec::AllIcmp => write!(f, "icmp"),
            PortSpec::All => write!(f, "all"),
        }
    }
}

/// One allowed inbound flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRule {
    pub peer: Peer,
    pub protocol: Protocol,
    pub port: PortSpec,
    pub description: String,
}

impl AccessRule {
    pub fn tcp(peer: Peer, port: u16, description: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::Tcp,
            port: PortSpec::Single { port },
            description: description.into(),
        }
    }

    pub fn icmp(peer: Peer, description: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::Icmp,
            port: PortSpec::AllIcmp,
            description: description.into(),
        }
    }

    /// True when the rule opens a whole protocol or a port range
    pub fn is_wildcard(&self) -> bool {
        matches!(self.protocol, Protocol::All)
            || matches!(self.port, PortSpec::All | PortSpec::Range { .. })
            || (self.port == PortSpec::AllIcmp && self.protocol != Protocol::Icmp)
    }

    pub fn single_port(&self) -> Option<u16> {
        match self.port {
            PortSpec::Single { port } => Some(port),
            _ => None,
        }
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{} from {} ({})",
            self.protocol, self.port, self.peer, self.description
        )
    }
}

/// A named set of inbound rules attached to one network
///
/// Rules are additive: there is no way to remove a rule once declared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessGroup {
    pub name: String,
    pub description: String,
    pub network_id: String,
    pub allow_all_outbound: bool,
    ingress: Vec<AccessRule>,
}

impl AccessGroup {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        network_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            network_id: network_id.into(),
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    pub fn allow(&mut self, rule: AccessRule) -> &mut Self {
        self.ingress.push(rule);
        self
    }

    pub fn ingress(&self) -> &[AccessRule] {
        &self.ingress
    }

    /// Does any rule let `peer` reach `port` over TCP
    pub fn allows_tcp(&self, peer: &Peer, port: u16) -> bool {
        self.ingress.iter().any(|rule| {
            rule.protocol == Protocol::Tcp && &rule.peer == peer && rule.single_port() == Some(port)
        })
    }
}
