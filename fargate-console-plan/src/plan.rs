//! The deployment plan
//!
//! A [`Plan`] is the ordered list of resources a stack declares. It is the
//! single artifact passed between planning, rendering and applying, and it
//! survives a JSON or YAML round-trip unchanged.

use std::fmt;

use fargate_console_models::{
    AccessGroup, AccessPointSpec, FileSystemSpec, LogSink, ScheduleRule, SecretBundle,
    ServiceInstance, WorkloadDefinition,
};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

// ============================================================================
// Resources
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    AccessGroup,
    FileSystem,
    AccessPoint,
    SecretBundle,
    LogSink,
    Workload,
    Service,
    ScheduleRule,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::AccessGroup => "access_group",
            ResourceKind::FileSystem => "file_system",
            ResourceKind::AccessPoint => "access_point",
            ResourceKind::SecretBundle => "secret_bundle",
            ResourceKind::LogSink => "log_sink",
            ResourceKind::Workload => "workload",
            ResourceKind::Service => "service",
            ResourceKind::ScheduleRule => "schedule_rule",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum ResourceProperties {
    AccessGroup(AccessGroup),
    FileSystem(FileSystemSpec),
    AccessPoint(AccessPointSpec),
    SecretBundle(SecretBundle),
    LogSink(LogSink),
    Workload(WorkloadDefinition),
    Service(ServiceInstance),
    ScheduleRule(ScheduleRule),
}

impl ResourceProperties {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceProperties::AccessGroup(_) => ResourceKind::AccessGroup,
            ResourceProperties::FileSystem(_) => ResourceKind::FileSystem,
            ResourceProperties::AccessPoint(_) => ResourceKind::AccessPoint,
            ResourceProperties::SecretBundle(_) => ResourceKind::SecretBundle,
            ResourceProperties::LogSink(_) => ResourceKind::LogSink,
            ResourceProperties::Workload(_) => ResourceKind::Workload,
            ResourceProperties::Service(_) => ResourceKind::Service,
            ResourceProperties::ScheduleRule(_) => ResourceKind::ScheduleRule,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedResource {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub properties: ResourceProperties,
}

impl PlannedResource {
    pub fn new(id: impl Into<String>, properties: ResourceProperties) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            properties,
        }
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.properties.kind()
    }
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// `{environment}-{project}-{service}`
    pub prefix: String,
    /// In creation order
    pub resources: Vec<PlannedResource>,
}

impl Plan {
    pub fn resource(&self, id: &str) -> Option<&PlannedResource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &PlannedResource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    /// Position of `id` in creation order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.id == id)
    }

    pub fn workload(&self) -> Option<&WorkloadDefinition> {
        self.resources.iter().find_map(|r| match &r.properties {
            ResourceProperties::Workload(workload) => Some(workload),
            _ => None,
        })
    }

    pub fn service(&self) -> Option<&ServiceInstance> {
        self.resources.iter().find_map(|r| match &r.properties {
            ResourceProperties::Service(service) => Some(service),
            _ => None,
        })
    }

    pub fn secret_bundle(&self) -> Option<&SecretBundle> {
        self.resources.iter().find_map(|r| match &r.properties {
            ResourceProperties::SecretBundle(bundle) => Some(bundle),
            _ => None,
        })
    }

    pub fn access_groups(&self) -> impl Iterator<Item = &AccessGroup> {
        self.resources.iter().filter_map(|r| match &r.properties {
            ResourceProperties::AccessGroup(group) => Some(group),
            _ => None,
        })
    }

    pub fn schedule_rules(&self) -> impl Iterator<Item = &ScheduleRule> {
        self.resources.iter().filter_map(|r| match &r.properties {
            ResourceProperties::ScheduleRule(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        serde_json::to_string_pretty(self).map_err(|e| PlanError::Encode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        serde_json::from_str(json).map_err(|e| PlanError::Encode(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, PlanError> {
        serde_yaml::to_string(self).map_err(|e| PlanError::Encode(e.to_string()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        serde_yaml::from_str(yaml).map_err(|e| PlanError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fargate_console_models::RemovalPolicy;

    fn bundle_resource() -> PlannedResource {
        PlannedResource::new(
            "dev-acme-conduktor-secrets",
            ResourceProperties::SecretBundle(SecretBundle {
                name: "dev-acme-conduktor-secrets".to_string(),
                fields: [("POSTGRES_USER".to_string(), String::new())].into(),
                removal_policy: RemovalPolicy::Destroy,
            }),
        )
    }

    #[test]
    fn test_resource_serialization() {
        let resource = bundle_resource().depends_on(["dev-acme-conduktor-sg"]);
        let json = serde_json::to_value(&resource).unwrap();

        assert_eq!(json["id"], "dev-acme-conduktor-secrets");
        assert_eq!(json["dependsOn"][0], "dev-acme-conduktor-sg");
        assert_eq!(json["properties"]["kind"], "secret_bundle");
        assert_eq!(json["properties"]["spec"]["name"], "dev-acme-conduktor-secrets");

        let back: PlannedResource = serde_json::from_value(json).unwrap();
        assert_eq!(back, resource);
    }

    #[test]
    fn test_plan_lookups() {
        let plan = Plan {
            prefix: "dev-acme-conduktor".to_string(),
            resources: vec![bundle_resource()],
        };

        assert_eq!(plan.ids(), vec!["dev-acme-conduktor-secrets"]);
        assert_eq!(plan.position("dev-acme-conduktor-secrets"), Some(0));
        assert!(plan.secret_bundle().is_some());
        assert!(plan.workload().is_none());
        assert_eq!(plan.of_kind(ResourceKind::SecretBundle).count(), 1);
        assert_eq!(plan.resources[0].kind().to_string(), "secret_bundle");
    }
}
