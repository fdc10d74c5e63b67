//! Scheduled scaling rule records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ServiceAddress;

/// Provider cron expression: minute hour day-of-month month day-of-week year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleExpression {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub day_of_week: String,
    pub year: String,
}

impl ScheduleExpression {
    /// Every day at `hour:minute` UTC
    pub fn daily_at(hour: u8, minute: u8) -> Self {
        Self {
            minute: minute.to_string(),
            hour: hour.to_string(),
            day_of_month: "*".to_string(),
            month: "*".to_string(),
            day_of_week: "?".to_string(),
            year: "*".to_string(),
        }
    }

    /// Standard five-field form, `?` mapped to `*` and the year dropped
    pub fn to_five_field(&self) -> String {
        let unify = |field: &str| if field == "?" { "*".to_string() } else { field.to_string() };
        format!(
            "{} {} {} {} {}",
            self.minute,
            self.hour,
            unify(&self.day_of_month),
            self.month,
            unify(&self.day_of_week)
        )
    }
}

impl fmt::Display for ScheduleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cron({} {} {} {} {} {})",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week, self.year
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Start,
    Stop,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Start => write!(f, "start"),
            ScheduleKind::Stop => write!(f, "stop"),
        }
    }
}

/// Permission a rule needs: one action on one service, nothing broader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGrant {
    pub action: String,
    pub resource: ServiceAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleRule {
    pub name: String,
    pub kind: ScheduleKind,
    pub expression: ScheduleExpression,
    pub target: ServiceAddress,
    pub desired_count: u32,
    pub enabled: bool,
    pub permission: PermissionGrant,
}
