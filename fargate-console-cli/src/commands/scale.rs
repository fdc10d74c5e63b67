use anyhow::{Context, Result};
use fargate_console_plan::{InMemoryServices, ScaleAction, ScaleOutcome};

use super::Workspace;

/// Scale the planned service inside an in-memory registry
///
/// With `missing` the registry is left empty, which exercises the not-found path
/// scheduled stop actions take once a stack has been torn down.
pub async fn execute(workspace: &Workspace, count: u32, missing: bool) -> Result<ScaleOutcome> {
    let plan = workspace.plan()?;
    let service = plan.service().context("Plan has no service")?;

    let services = InMemoryServices::new();
    if !missing {
        services
            .register(service.address.clone(), service.desired_count)
            .await;
    }

    let action = ScaleAction::new(service.address.clone(), count);
    tracing::info!(service = %action.address(), count, "Executing scale action");

    action
        .execute(&services)
        .await
        .with_context(|| format!("Failed to scale {}", action.address()))
}

pub async fn run_scale(workspace: &Workspace, count: u32, missing: bool) -> Result<()> {
    match execute(workspace, count, missing).await? {
        ScaleOutcome::Applied { previous, current } => {
            println!("✓ Desired count changed {} -> {}", previous, current)
        }
        ScaleOutcome::Unchanged { current } => {
            println!("✓ Desired count already {}", current)
        }
        ScaleOutcome::ServiceMissing => println!("⚠ Service not found, nothing to scale"),
    }
    Ok(())
}
