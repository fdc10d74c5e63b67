use anyhow::Result;
use fargate_console_plan::render_template;

use super::Workspace;
use crate::cli::PlanFormat;

pub fn render(workspace: &Workspace, format: PlanFormat) -> Result<String> {
    let plan = workspace.plan()?;

    let output = match format {
        PlanFormat::Json => plan.to_json()?,
        PlanFormat::Yaml => plan.to_yaml()?,
        PlanFormat::Template => render_template(&plan)?,
    };

    Ok(output)
}

pub fn run_plan(workspace: &Workspace, format: PlanFormat) -> Result<()> {
    println!("{}", render(workspace, format)?);
    Ok(())
}
