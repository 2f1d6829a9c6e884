// crates/cli/src/main.rs
//! `bookforge`: drive book generation against a running backend.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bookforge_core::{AppConfig, AppContext};
use bookforge_observability::{init_tracing, LogFormat, LoggingConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookforge", version, about = "Generate books with the bookforge backend")]
struct Cli {
    /// TOML config file (defaults to $BOOKFORGE_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding config and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Console log format: compact or json.
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Also write JSON logs to daily files in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the backend is reachable.
    Health,
    /// List projects.
    Projects,
    /// Show a project with its parts and chapters.
    Show { project_id: String },
    /// Create a project from a blueprint.
    Create { blueprint: String },
    /// List the specialist writing agents.
    Agents,
    /// Outline the parts of a project.
    GenerateParts {
        project_id: String,
        /// Print the job id and exit instead of waiting.
        #[arg(long)]
        detach: bool,
    },
    /// Outline the chapters of a part.
    GenerateChapters {
        /// Project that owns the part.
        #[arg(long)]
        project: String,
        part_id: String,
        #[arg(long)]
        detach: bool,
    },
    /// Write the content of a chapter.
    GenerateChapter {
        /// Project that owns the chapter.
        #[arg(long)]
        project: String,
        chapter_id: String,
        #[arg(long)]
        detach: bool,
    },
    /// Show the status of a job.
    Status { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_tracing(&LoggingConfig {
        format: cli.log_format,
        log_dir: cli.log_dir.clone(),
        default_directive: None,
    })?;

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    let ctx = AppContext::new(config).context("Failed to set up the backend client")?;
    let result = commands::run(&ctx, cli.command).await;
    ctx.shutdown();
    result
}
