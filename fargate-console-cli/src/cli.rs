use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// fargate-console - plan and operate the console stack
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Stack config file (overrides FARGATE_CONSOLE_STACK_FILE)
    #[arg(long, global = true)]
    pub stack: Option<PathBuf>,

    /// Network definitions file (overrides FARGATE_CONSOLE_NETWORK_FILE)
    #[arg(long, global = true)]
    pub networks: Option<PathBuf>,

    /// Cluster the service joins (overrides FARGATE_CONSOLE_CLUSTER)
    #[arg(long, global = true)]
    pub cluster: Option<String>,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Check the stack config and compute the plan without printing it
    Validate,

    /// Print the plan
    Plan {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = PlanFormat::Json)]
        format: PlanFormat,
    },

    /// Apply the plan against an in-memory provider and list the creations
    Apply,

    /// Show the next start/stop times and the daily running window
    Schedule {
        /// Number of days of fire times to list
        #[arg(short, long, default_value = "1")]
        days: u32,
    },

    /// Set the desired count of the service
    Scale {
        /// Desired number of tasks
        #[arg(short, long)]
        count: u32,

        /// Run against a registry where the service does not exist
        #[arg(long)]
        missing: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
    /// Rendered provider template
    Template,
}
