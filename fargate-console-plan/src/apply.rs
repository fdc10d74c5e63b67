//! Plan application
//!
//! Walks a plan in creation order against a [`ResourceProvisioner`]. A resource
//! that already exists is skipped, so applying the same plan twice is safe. The
//! first failed creation stops the run; resources created before it stay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::plan::{Plan, PlannedResource, ResourceKind};

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("provider rejected {kind} '{id}': {message}")]
    Rejected {
        id: String,
        kind: ResourceKind,
        message: String,
    },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Creates resources in the target environment
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    async fn exists(&self, resource: &PlannedResource) -> Result<bool, ProvisionError>;

    async fn create(&self, resource: &PlannedResource) -> Result<(), ProvisionError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceFailure {
    pub id: String,
    pub kind: ResourceKind,
    pub error: ProvisionError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyReport {
    pub run_id: Uuid,
    pub created: Vec<String>,
    /// Already present before this run
    pub skipped: Vec<String>,
    pub failure: Option<ResourceFailure>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub async fn apply_plan(plan: &Plan, provisioner: &dyn ResourceProvisioner) -> ApplyReport {
    let mut report = ApplyReport {
        run_id: Uuid::new_v4(),
        created: Vec::new(),
        skipped: Vec::new(),
        failure: None,
    };

    tracing::info!(
        run_id = %report.run_id,
        prefix = %plan.prefix,
        resources = plan.resources.len(),
        "Applying plan"
    );

    for resource in &plan.resources {
        match provision(resource, provisioner).await {
            Ok(true) => {
                tracing::debug!(id = %resource.id, kind = %resource.kind(), "Resource created");
                report.created.push(resource.id.clone());
            }
            Ok(false) => {
                tracing::debug!(
                    id = %resource.id,
                    kind = %resource.kind(),
                    "Resource exists, skipping"
                );
                report.skipped.push(resource.id.clone());
            }
            Err(error) => {
                tracing::error!(
                    id = %resource.id,
                    kind = %resource.kind(),
                    error = %error,
                    "Resource creation failed"
                );
                report.failure = Some(ResourceFailure {
                    id: resource.id.clone(),
                    kind: resource.kind(),
                    error,
                });
                break;
            }
        }
    }

    tracing::info!(
        run_id = %report.run_id,
        created = report.created.len(),
        skipped = report.skipped.len(),
        failed = report.failure.is_some(),
        "Plan applied"
    );

    report
}

/// Returns whether the resource was created by this call
async fn provision(
    resource: &PlannedResource,
    provisioner: &dyn ResourceProvisioner,
) -> Result<bool, ProvisionError> {
    if provisioner.exists(resource).await? {
        return Ok(false);
    }
    provisioner.create(resource).await?;
    Ok(true)
}

/// Provisioner that records creations in memory
#[derive(Debug, Default)]
pub struct InMemoryProvisioner {
    created: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the resource with this id
    pub fn failing_on(id: impl Into<String>) -> Self {
        Self {
            created: Mutex::default(),
            fail_on: Some(id.into()),
        }
    }

    /// Stop rejecting anything
    pub fn recover(&mut self) {
        self.fail_on = None;
    }

    /// Ids in creation order
    pub async fn created(&self) -> Vec<String> {
        self.created.lock().await.clone()
    }
}

#[async_trait]
impl ResourceProvisioner for InMemoryProvisioner {
    async fn exists(&self, resource: &PlannedResource) -> Result<bool, ProvisionError> {
        Ok(self.created.lock().await.contains(&resource.id))
    }

    async fn create(&self, resource: &PlannedResource) -> Result<(), ProvisionError> {
        if self.fail_on.as_deref() == Some(resource.id.as_str()) {
            return Err(ProvisionError::Rejected {
                id: resource.id.clone(),
                kind: resource.kind(),
                message: "injected failure".to_string(),
            });
        }

        let mut created = self.created.lock().await;
        if !created.contains(&resource.id) {
            created.push(resource.id.clone());
        }
        Ok(())
    }
}
