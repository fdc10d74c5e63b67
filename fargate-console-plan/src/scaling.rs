//! Scale actions: the one mutation schedules may apply to a live service
//!
//! A [`ScaleAction`] carries a single service address and a replica count. It
//! cannot redeploy, reconfigure or touch any other service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fargate_console_models::{ScheduleRule, ServiceAddress};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("service {0} not found")]
    ServiceNotFound(ServiceAddress),

    #[error("control plane rejected desired count for {address}: {message}")]
    Rejected {
        address: ServiceAddress,
        message: String,
    },
}

/// Access to the desired count of running services
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn desired_count(&self, address: &ServiceAddress) -> Result<u32, ControlError>;

    async fn set_desired_count(
        &self,
        address: &ServiceAddress,
        desired_count: u32,
    ) -> Result<(), ControlError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleAction {
    address: ServiceAddress,
    desired_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    Applied { previous: u32, current: u32 },
    /// Desired count already matched
    Unchanged { current: u32 },
    /// Target is gone; nothing to do
    ServiceMissing,
}

impl ScaleAction {
    pub fn new(address: ServiceAddress, desired_count: u32) -> Self {
        Self {
            address,
            desired_count,
        }
    }

    pub fn for_rule(rule: &ScheduleRule) -> Self {
        Self::new(rule.target.clone(), rule.desired_count)
    }

    pub fn address(&self) -> &ServiceAddress {
        &self.address
    }

    pub fn desired_count(&self) -> u32 {
        self.desired_count
    }

    /// Apply the action. A missing service is logged and reported, not an error.
    pub async fn execute(
        &self,
        control: &dyn ServiceControl,
    ) -> Result<ScaleOutcome, ControlError> {
        let previous = match control.desired_count(&self.address).await {
            Ok(count) => count,
            Err(ControlError::ServiceNotFound(address)) => {
                tracing::warn!(service = %address, "Scale target not found, skipping");
                return Ok(ScaleOutcome::ServiceMissing);
            }
            Err(e) => return Err(e),
        };

        if previous == self.desired_count {
            tracing::debug!(service = %self.address, count = previous, "Desired count unchanged");
            return Ok(ScaleOutcome::Unchanged { current: previous });
        }

        match control
            .set_desired_count(&self.address, self.desired_count)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    service = %self.address,
                    previous,
                    current = self.desired_count,
                    "Desired count updated"
                );
                Ok(ScaleOutcome::Applied {
                    previous,
                    current: self.desired_count,
                })
            }
            // The service can vanish between the read and the write.
            Err(ControlError::ServiceNotFound(address)) => {
                tracing::warn!(service = %address, "Scale target disappeared, skipping");
                Ok(ScaleOutcome::ServiceMissing)
            }
            Err(e) => Err(e),
        }
    }
}

/// Services held in memory
#[derive(Debug, Default)]
pub struct InMemoryServices {
    services: RwLock<BTreeMap<ServiceAddress, u32>>,
}

impl InMemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, address: ServiceAddress, desired_count: u32) {
        self.services.write().await.insert(address, desired_count);
    }
}

#[async_trait]
impl ServiceControl for InMemoryServices {
    async fn desired_count(&self, address: &ServiceAddress) -> Result<u32, ControlError> {
        self.services
            .read()
            .await
            .get(address)
            .copied()
            .ok_or_else(|| ControlError::ServiceNotFound(address.clone()))
    }

    async fn set_desired_count(
        &self,
        address: &ServiceAddress,
        desired_count: u32,
    ) -> Result<(), ControlError> {
        let mut services = self.services.write().await;
        let current = services
            .get_mut(address)
            .ok_or_else(|| ControlError::ServiceNotFound(address.clone()))?;
        *current = desired_count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ServiceAddress {
        ServiceAddress::new("shared-cluster", "dev-acme-conduktor-service")
    }

    #[tokio::test]
    async fn test_scale_down_running_service() {
        let services = InMemoryServices::new();
        services.register(address(), 1).await;

        let outcome = ScaleAction::new(address(), 0).execute(&services).await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Applied { previous: 1, current: 0 });
        assert_eq!(services.desired_count(&address()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reapplying_is_a_noop() {
        let services = InMemoryServices::new();
        services.register(address(), 0).await;

        let action = ScaleAction::new(address(), 0);
        assert_eq!(
            action.execute(&services).await.unwrap(),
            ScaleOutcome::Unchanged { current: 0 }
        );
        assert_eq!(
            action.execute(&services).await.unwrap(),
            ScaleOutcome::Unchanged { current: 0 }
        );
    }

    #[tokio::test]
    async fn test_missing_service_is_swallowed() {
        let services = InMemoryServices::new();
        let outcome = ScaleAction::new(address(), 0).execute(&services).await.unwrap();
        assert_eq!(outcome, ScaleOutcome::ServiceMissing);
    }

    #[tokio::test]
    async fn test_action_only_touches_its_service() {
        let services = InMemoryServices::new();
        let other = ServiceAddress::new("shared-cluster", "prod-acme-conduktor-service");
        services.register(address(), 1).await;
        services.register(other.clone(), 1).await;

        ScaleAction::new(address(), 0).execute(&services).await.unwrap();
        assert_eq!(services.desired_count(&other).await.unwrap(), 1);
    }

    struct Rejecting;

    #[async_trait]
    impl ServiceControl for Rejecting {
        async fn desired_count(&self, _address: &ServiceAddress) -> Result<u32, ControlError> {
            Ok(1)
        }

        async fn set_desired_count(
            &self,
            address: &ServiceAddress,
            _desired_count: u32,
        ) -> Result<(), ControlError> {
            Err(ControlError::Rejected {
                address: address.clone(),
                message: "throttled".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let result = ScaleAction::new(address(), 0).execute(&Rejecting).await;
        assert!(matches!(result, Err(ControlError::Rejected { .. })));
    }
}
