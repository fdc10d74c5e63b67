//! Plan-time errors
//!
//! Everything here is raised while the plan is computed, before any resource
//! exists. Provisioning failures are reported through [`crate::apply::ApplyReport`].

use fargate_console_models::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network '{0}' not found")]
    NetworkNotFound(String),

    #[error("network '{0}' has no private subnets")]
    NoPrivateSubnets(String),

    #[error("container '{container}' references unknown secret field '{field}' in bundle '{bundle}'")]
    UnknownSecretField {
        container: String,
        bundle: String,
        field: String,
    },

    #[error("containers request {requested} {resource} but the task budget is {budget}")]
    BudgetExceeded {
        resource: &'static str,
        requested: u32,
        budget: u32,
    },

    #[error("access group '{group}' has a rule broader than the declared flows: {rule}")]
    BroadRule { group: String, rule: String },

    #[error("image '{0}' must be pinned to a tag other than 'latest'")]
    UnpinnedImage(String),

    #[error(
        "grace period {grace}s does not cover the slowest start period {start_period}s \
         plus {latency}s startup latency"
    )]
    GracePeriodTooShort {
        grace: u32,
        start_period: u32,
        latency: u32,
    },

    #[error("volume '{volume}' must be mounted read-write by exactly one container, found {writers}")]
    VolumeWriters { volume: String, writers: usize },

    #[error("container '{container}' depends on unknown container '{on}'")]
    UnknownDependency { container: String, on: String },

    #[error("log pattern '{pattern}' for container '{container}' is invalid: {reason}")]
    LogPattern {
        container: String,
        pattern: String,
        reason: String,
    },

    #[error("duplicate resource id '{0}'")]
    DuplicateResource(String),

    #[error("resource '{resource}' depends on undeclared resource '{missing}'")]
    DanglingDependency { resource: String, missing: String },

    #[error("dependency cycle through resource '{0}'")]
    DependencyCycle(String),

    #[error("invalid schedule '{expression}': {reason}")]
    Schedule { expression: String, reason: String },

    #[error("failed to render plan: {0}")]
    Render(String),

    #[error("failed to encode plan: {0}")]
    Encode(String),
}
