//! Start/stop schedule rules and their evaluation

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use croner::Cron;
use fargate_console_models::{
    PermissionGrant, ScheduleExpression, ScheduleKind, ScheduleRule, ServiceAddress,
};

use crate::error::PlanError;
use crate::names::ResourceNames;

/// 14:00 UTC
pub const START_HOUR: u8 = 14;

/// 02:00 UTC
pub const STOP_HOUR: u8 = 2;

/// The one action a schedule rule may perform
pub const SET_DESIRED_COUNT: &str = "service:SetDesiredCount";

/// Daily start rule; off until an operator enables it
pub fn start_rule(names: &ResourceNames, target: &ServiceAddress) -> ScheduleRule {
    rule(names, target, ScheduleKind::Start, START_HOUR, 1, false)
}

/// Daily stop rule; on by default
pub fn stop_rule(names: &ResourceNames, target: &ServiceAddress) -> ScheduleRule {
    rule(names, target, ScheduleKind::Stop, STOP_HOUR, 0, true)
}

fn rule(
    names: &ResourceNames,
    target: &ServiceAddress,
    kind: ScheduleKind,
    hour: u8,
    desired_count: u32,
    enabled: bool,
) -> ScheduleRule {
    ScheduleRule {
        name: names.schedule_rule(kind),
        kind,
        expression: ScheduleExpression::daily_at(hour, 0),
        target: target.clone(),
        desired_count,
        enabled,
        permission: PermissionGrant {
            action: SET_DESIRED_COUNT.to_string(),
            resource: target.clone(),
        },
    }
}

fn parse(expression: &ScheduleExpression) -> Result<Cron, PlanError> {
    Cron::new(&expression.to_five_field())
        .parse()
        .map_err(|e| PlanError::Schedule {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
}

/// First time strictly after `after` at which the rule fires
pub fn next_fire(rule: &ScheduleRule, after: DateTime<Utc>) -> Result<DateTime<Utc>, PlanError> {
    parse(&rule.expression)?
        .find_next_occurrence(&after, false)
        .map_err(|e| PlanError::Schedule {
            expression: rule.expression.to_string(),
            reason: e.to_string(),
        })
}

/// All fire times in `[from, until)`
pub fn fire_times(
    rule: &ScheduleRule,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, PlanError> {
    let mut times = Vec::new();
    // Start one second early so a fire exactly at `from` is included.
    let mut cursor = from - Duration::seconds(1);
    loop {
        let next = next_fire(rule, cursor)?;
        if next >= until {
            return Ok(times);
        }
        times.push(next);
        cursor = next;
    }
}

/// When the service runs on a given day if both rules are active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningWindow {
    pub starts_at: DateTime<Utc>,
    pub stops_at: DateTime<Utc>,
}

impl RunningWindow {
    pub fn duration(&self) -> Duration {
        self.stops_at - self.starts_at
    }
}

/// The window opened by the first start on `day` and closed by the next stop
pub fn running_window(
    start: &ScheduleRule,
    stop: &ScheduleRule,
    day: NaiveDate,
) -> Result<RunningWindow, PlanError> {
    let midnight = day.and_time(NaiveTime::MIN).and_utc();
    let starts_at = next_fire(start, midnight - Duration::seconds(1))?;
    let stops_at = next_fire(stop, starts_at)?;
    Ok(RunningWindow {
        starts_at,
        stops_at,
    })
}

/// Start and stop must never fire together and must alternate
pub fn check_alternating(
    start: &ScheduleRule,
    stop: &ScheduleRule,
    from: DateTime<Utc>,
    days: i64,
) -> Result<(), PlanError> {
    let until = from + Duration::days(days);

    let mut fires: Vec<(DateTime<Utc>, ScheduleKind)> = fire_times(start, from, until)?
        .into_iter()
        .map(|t| (t, ScheduleKind::Start))
        .chain(
            fire_times(stop, from, until)?
                .into_iter()
                .map(|t| (t, ScheduleKind::Stop)),
        )
        .collect();
    fires.sort_by_key(|(time, _)| *time);

    for pair in fires.windows(2) {
        let ((first_time, first_kind), (second_time, second_kind)) = (pair[0], pair[1]);
        if first_time == second_time || first_kind == second_kind {
            return Err(PlanError::Schedule {
                expression: format!("{} / {}", start.expression, stop.expression),
                reason: format!(
                    "{first_kind} at {first_time} is followed by {second_kind} at {second_time}"
                ),
            });
        }
    }

    Ok(())
}
