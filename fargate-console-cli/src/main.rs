use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod cli;
mod commands;
mod config;

use cli::{Args, Mode};
use commands::Workspace;
use config::Config;

/// Initialize tracing with two outputs:
/// 1. File output (~/.fargate-console/cli.log) - everything the filter lets through
/// 2. Stderr - warnings and errors only, so stdout stays clean for plan output
fn initialize_tracing() -> Result<WorkerGuard> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,\
         fargate_console_plan=debug,\
         fargate_console_cli=debug"
            .into()
    });

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let log_dir = PathBuf::from(home).join(".fargate-console");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, "cli.log");
    // The guard flushes the file writer on drop; main keeps it alive.
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _guard = initialize_tracing()?;

    let config = Config::load()?.with_args(&args);
    tracing::debug!(?config, "Configuration loaded");

    let workspace = Workspace::load(&config)?;

    match args.mode {
        Mode::Validate => commands::run_validate(&workspace),
        Mode::Plan { format } => commands::plan::run_plan(&workspace, format),
        Mode::Apply => commands::apply::run_apply(&workspace).await,
        Mode::Schedule { days } => commands::schedule::run_schedule(&workspace, days),
        Mode::Scale { count, missing } => {
            commands::scale::run_scale(&workspace, count, missing).await
        }
    }
}
