//! Shared fixtures for unit tests

use fargate_console_models::StackConfig;

use crate::names::ResourceNames;
use crate::network::{NetworkContext, StaticNetworks, Subnet};

pub const SAMPLE_STACK: &str = r#"
project: acme
service: conduktor
environment: dev
domain: example.com
subdomain: console
networkId: net-123
memoryLimit: 4096
cpuUnits: 1024
desiredCount: 1
healthCheckPath: /api/health/live
"#;

pub fn sample_config() -> StackConfig {
    StackConfig::from_yaml_str(SAMPLE_STACK).unwrap()
}

pub fn sample_names() -> ResourceNames {
    ResourceNames::new(&sample_config())
}

pub fn sample_network() -> NetworkContext {
    NetworkContext {
        network_id: "net-123".to_string(),
        cidr: "10.20.0.0/16".parse().unwrap(),
        private_subnets: vec![
            Subnet {
                id: "subnet-a".to_string(),
                cidr: "10.20.1.0/24".parse().unwrap(),
                availability_zone: Some("eu-west-1a".to_string()),
            },
            Subnet {
                id: "subnet-b".to_string(),
                cidr: "10.20.2.0/24".parse().unwrap(),
                availability_zone: Some("eu-west-1b".to_string()),
            },
        ],
    }
}

pub fn sample_networks() -> StaticNetworks {
    StaticNetworks::new().with_network(sample_network())
}
