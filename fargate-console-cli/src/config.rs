use std::path::PathBuf;

use anyhow::{Context, Result};
use ipnet::Ipv4Net;

use crate::cli::Args;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub stack_file: PathBuf,
    pub network_file: PathBuf,
    /// Replaces the stack's management CIDR when set
    pub management_cidr: Option<Ipv4Net>,
    pub cluster: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            stack_file: var("FARGATE_CONSOLE_STACK_FILE")
                .unwrap_or_else(|| "stack.yaml".to_string())
                .into(),
            network_file: var("FARGATE_CONSOLE_NETWORK_FILE")
                .unwrap_or_else(|| "networks.yaml".to_string())
                .into(),
            management_cidr: var("FARGATE_CONSOLE_MANAGEMENT_CIDR")
                .map(|cidr| cidr.parse::<Ipv4Net>())
                .transpose()
                .context("FARGATE_CONSOLE_MANAGEMENT_CIDR must be an IPv4 CIDR")?,
            cluster: var("FARGATE_CONSOLE_CLUSTER")
                .unwrap_or_else(|| fargate_console_plan::builder::DEFAULT_CLUSTER.to_string()),
        })
    }

    /// Command-line flags win over the environment
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(stack) = &args.stack {
            self.stack_file = stack.clone();
        }
        if let Some(networks) = &args.networks {
            self.network_file = networks.clone();
        }
        if let Some(cluster) = &args.cluster {
            self.cluster = cluster.clone();
        }
        self
    }
}
