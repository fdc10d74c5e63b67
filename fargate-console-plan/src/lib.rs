//! Fargate Console Plan - builds, renders and applies the console stack plan
//!
//! This crate turns a [`StackConfig`](fargate_console_models::StackConfig) into a
//! dependency-ordered [`Plan`] of resources: access groups, the encrypted
//! filesystem, the secret bundle, log sinks, the three-container workload, the
//! service and its start/stop schedules.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fargate_console_models::StackConfig;
//! use fargate_console_plan::{apply_plan, InMemoryProvisioner, PlanBuilder, StaticNetworks};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = StackConfig::from_yaml_file("stack.yaml")?;
//! let networks = StaticNetworks::from_yaml_file("networks.yaml")?;
//!
//! let plan = PlanBuilder::new(config, &networks).build()?;
//! let report = apply_plan(&plan, &InMemoryProvisioner::new()).await;
//! assert!(report.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod builder;
pub mod error;
pub mod graph;
pub mod names;
pub mod network;
pub mod plan;
pub mod scaling;
pub mod schedule;
pub mod secrets;
pub mod security;
pub mod service;
pub mod startup;
pub mod storage;
pub mod template;
pub mod workload;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use apply::{apply_plan, ApplyReport, InMemoryProvisioner, ProvisionError, ResourceProvisioner};
pub use builder::PlanBuilder;
pub use error::PlanError;
pub use network::{NetworkContext, NetworkLookup, StaticNetworks, Subnet};
pub use plan::{Plan, PlannedResource, ResourceKind, ResourceProperties};
pub use scaling::{ControlError, InMemoryServices, ScaleAction, ScaleOutcome, ServiceControl};
pub use startup::{ContainerPhase, StartupTracker};
pub use template::render_template;
