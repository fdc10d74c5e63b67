pub mod apply;
pub mod plan;
pub mod scale;
pub mod schedule;

use anyhow::{Context, Result};
use fargate_console_models::StackConfig;
use fargate_console_plan::{Plan, PlanBuilder, StaticNetworks};

use crate::config::Config;

/// Everything a command needs to compute the plan
pub struct Workspace {
    pub stack: StackConfig,
    pub networks: StaticNetworks,
    pub cluster: String,
}

impl Workspace {
    pub fn load(config: &Config) -> Result<Self> {
        let mut stack = StackConfig::from_yaml_file(&config.stack_file).with_context(|| {
            format!("Failed to load stack config {}", config.stack_file.display())
        })?;

        if let Some(cidr) = config.management_cidr {
            tracing::debug!(%cidr, "Management CIDR overridden from environment");
            stack.management_cidr = cidr;
        }

        let networks = StaticNetworks::from_yaml_file(&config.network_file)?;

        Ok(Self {
            stack,
            networks,
            cluster: config.cluster.clone(),
        })
    }

    pub fn builder(&self) -> PlanBuilder<'_> {
        PlanBuilder::new(self.stack.clone(), &self.networks).with_cluster(&self.cluster)
    }

    pub fn plan(&self) -> Result<Plan> {
        self.builder().build().context("Failed to compute plan")
    }
}

pub fn run_validate(workspace: &Workspace) -> Result<()> {
    let plan = workspace.plan()?;

    println!("✓ Stack {} is valid", plan.prefix);
    println!();
    println!("{:<50} {:<15}", "RESOURCE", "KIND");
    println!("{}", "-".repeat(65));
    for resource in &plan.resources {
        println!("{:<50} {:<15}", resource.id, resource.kind());
    }
    println!();
    println!("{} resource(s) planned", plan.resources.len());

    Ok(())
}
