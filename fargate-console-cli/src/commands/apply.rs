use anyhow::Result;
use fargate_console_plan::{apply_plan, ApplyReport, InMemoryProvisioner};

use super::Workspace;

pub async fn dry_run(workspace: &Workspace) -> Result<ApplyReport> {
    let plan = workspace.plan()?;
    let provisioner = InMemoryProvisioner::new();
    Ok(apply_plan(&plan, &provisioner).await)
}

pub async fn run_apply(workspace: &Workspace) -> Result<()> {
    let report = dry_run(workspace).await?;

    println!("Apply run {} (in-memory)", report.run_id);
    println!("{}", "=".repeat(60));
    for (step, id) in report.created.iter().enumerate() {
        println!("  {:>2}. create {}", step + 1, id);
    }
    for id in &report.skipped {
        println!("      skip   {}", id);
    }

    if let Some(failure) = &report.failure {
        anyhow::bail!("Failed to create {} '{}': {}", failure.kind, failure.id, failure.error);
    }

    println!();
    println!("✓ {} resource(s) created", report.created.len());
    Ok(())
}
