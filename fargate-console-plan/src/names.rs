//! Resource names for a stack
//!
//! Every name is derived from the `{environment}-{project}-{service}` prefix, so
//! computing a plan twice from the same config yields the same names.

use fargate_console_models::{ScheduleKind, StackConfig};

/// Container names inside the workload
pub mod containers {
    /// PostgreSQL holding the console's state
    pub const DATABASE: &str = "postgresql";

    /// Console UI and API
    pub const CONSOLE: &str = "conduktor-console";

    /// Monitoring sidecar scraping the console
    pub const MONITORING: &str = "conduktor-monitoring";
}

/// Resource kinds, used as the suffix of plan resource ids
pub mod kinds {
    pub const ACCESS_GROUP: &str = "sg";
    pub const STORAGE_ACCESS_GROUP: &str = "efs-sg";
    pub const FILE_SYSTEM: &str = "efs";
    pub const ACCESS_POINT: &str = "efs-ap";
    pub const SECRETS: &str = "secrets";
    pub const TASK: &str = "task";
    pub const SERVICE: &str = "service";
    pub const LOGS: &str = "logs";
    pub const SCHEDULE: &str = "schedule";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    prefix: String,
}

impl ResourceNames {
    pub fn new(config: &StackConfig) -> Self {
        Self {
            prefix: config.resource_prefix(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn join(&self, suffix: &str) -> String {
        format!("{}-{}", self.prefix, suffix)
    }

    pub fn access_group(&self) -> String {
        self.join(kinds::ACCESS_GROUP)
    }

    pub fn storage_access_group(&self) -> String {
        self.join(kinds::STORAGE_ACCESS_GROUP)
    }

    pub fn file_system(&self) -> String {
        self.join(kinds::FILE_SYSTEM)
    }

    pub fn access_point(&self) -> String {
        self.join(kinds::ACCESS_POINT)
    }

    /// Volume name inside the task; not a standalone resource
    pub fn volume(&self) -> String {
        self.join("data")
    }

    pub fn secret_bundle(&self) -> String {
        self.join(kinds::SECRETS)
    }

    pub fn task_family(&self) -> String {
        self.join(kinds::TASK)
    }

    pub fn service(&self) -> String {
        self.join(kinds::SERVICE)
    }

    /// Plan id of a container's log sink
    pub fn log_sink_id(&self, container: &str) -> String {
        format!("{}-{}-{}", self.prefix, kinds::LOGS, container)
    }

    /// Log destination path, `{prefix}/{container}`
    pub fn log_group(&self, container: &str) -> String {
        format!("{}/{}", self.prefix, container)
    }

    pub fn schedule_rule(&self, kind: ScheduleKind) -> String {
        format!("{}-{}-{}", self.prefix, kinds::SCHEDULE, kind)
    }
}
