//! Fargate Console Models - configuration records for the console stack
//!
//! Every type here is a plain declaration record: nothing in this crate talks to
//! a provider. The plan crate builds these records from a [`StackConfig`] and
//! orders them into a deployment plan.

pub mod config;
pub mod container;
pub mod network;
pub mod schedule;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod workload;

pub use config::*;
pub use container::*;
pub use network::*;
pub use schedule::*;
pub use secrets::*;
pub use service::*;
pub use storage::*;
pub use workload::*;

use serde::{Deserialize, Serialize};

/// What happens to a resource when the stack is destroyed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn is_destructive(&self) -> bool {
        matches!(self, RemovalPolicy::Destroy)
    }
}
