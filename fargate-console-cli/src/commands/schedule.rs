use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use fargate_console_models::{ScheduleKind, ScheduleRule};
use fargate_console_plan::schedule::{fire_times, next_fire, running_window, RunningWindow};

use super::Workspace;

pub struct RuleSummary {
    pub rule: ScheduleRule,
    pub next: DateTime<Utc>,
    pub upcoming: Vec<DateTime<Utc>>,
}

pub struct ScheduleSummary {
    pub rules: Vec<RuleSummary>,
    pub window: RunningWindow,
}

pub fn summarize(workspace: &Workspace, now: DateTime<Utc>, days: u32) -> Result<ScheduleSummary> {
    let plan = workspace.plan()?;
    let until = now + Duration::days(i64::from(days));

    let rules = plan
        .schedule_rules()
        .map(|rule| -> Result<RuleSummary> {
            Ok(RuleSummary {
                rule: rule.clone(),
                next: next_fire(rule, now)?,
                upcoming: fire_times(rule, now, until)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let find = |kind: ScheduleKind| {
        rules
            .iter()
            .find(|summary| summary.rule.kind == kind)
            .map(|summary| &summary.rule)
            .with_context(|| format!("Plan has no {kind} rule"))
    };
    let window = running_window(
        find(ScheduleKind::Start)?,
        find(ScheduleKind::Stop)?,
        now.date_naive(),
    )?;

    Ok(ScheduleSummary { rules, window })
}

pub fn run_schedule(workspace: &Workspace, days: u32) -> Result<()> {
    let summary = summarize(workspace, Utc::now(), days)?;

    println!("{:<8} {:<22} {:<10} {:<6} {}", "RULE", "EXPRESSION", "STATE", "COUNT", "NEXT");
    println!("{}", "-".repeat(75));
    for entry in &summary.rules {
        let state = if entry.rule.enabled { "enabled" } else { "disabled" };
        println!(
            "{:<8} {:<22} {:<10} {:<6} {}",
            entry.rule.kind.to_string(),
            entry.rule.expression.to_string(),
            state,
            entry.rule.desired_count,
            entry.next.to_rfc3339()
        );
    }

    println!();
    println!(
        "Running window: {} -> {} ({}h)",
        summary.window.starts_at.to_rfc3339(),
        summary.window.stops_at.to_rfc3339(),
        summary.window.duration().num_hours()
    );

    if days > 1 {
        println!();
        for entry in &summary.rules {
            println!("{} fires in the next {} day(s):", entry.rule.kind, days);
            for time in &entry.upcoming {
                println!("  {}", time.to_rfc3339());
            }
        }
    }

    Ok(())
}
