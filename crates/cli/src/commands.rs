// crates/cli/src/commands.rs
//! Subcommand handlers. Results go to stdout, progress and logs to stderr.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use bookforge_client::BackendApi;
use bookforge_core::{AppContext, GenerationStart, PollEvent, PollOutcome, PollUpdate};
use bookforge_types::Project;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::Command;

pub(crate) async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Health => health(ctx).await,
        Command::Projects => list_projects(ctx).await,
        Command::Show { project_id } => {
            let project = load_project(ctx, &project_id).await?;
            print_project(&project);
            Ok(())
        }
        Command::Create { blueprint } => {
            let project = ctx.projects.create_project(&blueprint).await?;
            println!("{}", project.id);
            Ok(())
        }
        Command::Agents => {
            ctx.agents.fetch_agent_names().await;
            if let Some(error) = ctx.agents.error() {
                bail!(error);
            }
            for name in ctx.agents.available_agents() {
                println!("{name}");
            }
            Ok(())
        }
        Command::GenerateParts { project_id, detach } => {
            let updates = ctx.poller.subscribe();
            let start = ctx.projects.generate_parts(&project_id).await;
            follow(ctx, updates, start, detach).await
        }
        Command::GenerateChapters {
            project,
            part_id,
            detach,
        } => {
            let loaded = load_project(ctx, &project).await?;
            if loaded.part(&part_id).is_none() {
                bail!("Project {project} has no part {part_id}");
            }
            let updates = ctx.poller.subscribe();
            let start = ctx.projects.generate_chapters(&part_id).await;
            follow(ctx, updates, start, detach).await
        }
        Command::GenerateChapter {
            project,
            chapter_id,
            detach,
        } => {
            let loaded = load_project(ctx, &project).await?;
            if loaded.chapter(&chapter_id).is_none() {
                bail!("Project {project} has no chapter {chapter_id}");
            }
            let updates = ctx.poller.subscribe();
            let start = ctx.projects.generate_chapter_content(&chapter_id).await;
            follow(ctx, updates, start, detach).await
        }
        Command::Status { job_id } => {
            let report = ctx.api.job_status(&job_id).await?;
            match report.error {
                Some(error) => println!("{}: {error}", report.status),
                None => println!("{}", report.status),
            }
            Ok(())
        }
    }
}

async fn health(ctx: &AppContext) -> Result<()> {
    let health = ctx.api.health().await?;
    if !health.is_ok() {
        bail!("Backend reported status '{}'", health.status);
    }
    match health.version {
        Some(version) => println!("ok (version {version})"),
        None => println!("ok"),
    }
    Ok(())
}

async fn list_projects(ctx: &AppContext) -> Result<()> {
    ctx.projects.fetch_projects().await;
    if let Some(error) = ctx.projects.error() {
        bail!(error);
    }
    for project in ctx.projects.projects() {
        println!(
            "{}\t{}\t{}\t{}",
            project.id,
            project.status.as_deref().unwrap_or("-"),
            project.total_cost.as_deref().unwrap_or("-"),
            first_line(&project.raw_blueprint),
        );
    }
    Ok(())
}

async fn load_project(ctx: &AppContext, project_id: &str) -> Result<Project> {
    ctx.projects.fetch_project_by_id(project_id).await;
    if let Some(error) = ctx.projects.error() {
        bail!(error);
    }
    ctx.projects
        .active_project()
        .with_context(|| format!("Project {project_id} was not loaded"))
}

async fn follow(
    ctx: &AppContext,
    updates: broadcast::Receiver<PollUpdate>,
    start: GenerationStart,
    detach: bool,
) -> Result<()> {
    match start {
        GenerationStart::Started { job_id } if detach => {
            println!("{job_id}");
            Ok(())
        }
        GenerationStart::Started { job_id } => wait_for_job(ctx, updates, &job_id).await,
        GenerationStart::Completed => {
            println!("done");
            Ok(())
        }
        GenerationStart::Skipped => bail!("No active project"),
        GenerationStart::Rejected { message } => bail!(message),
    }
}

async fn wait_for_job(
    ctx: &AppContext,
    mut updates: broadcast::Receiver<PollUpdate>,
    job_id: &str,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Job {job_id} queued"));

    let outcome = loop {
        let update = tokio::select! {
            update = updates.recv() => update,
            _ = tokio::signal::ctrl_c() => {
                ctx.projects.cancel_polling(job_id);
                spinner.abandon_with_message(format!("Stopped watching job {job_id}"));
                bail!("Interrupted; job {job_id} keeps running on the backend");
            }
        };
        match update {
            Ok(update) if update.job_id == job_id => match update.event {
                PollEvent::Status(status) => {
                    spinner.set_message(format!("Job {job_id} {status} (check {})", update.attempt));
                }
                PollEvent::Finished(outcome) => break outcome,
            },
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "poll updates lagged"),
            Err(RecvError::Closed) => bail!("Poller stopped before job {job_id} finished"),
        }
    };

    match outcome {
        PollOutcome::Succeeded => {
            spinner.finish_with_message(format!("Job {job_id} completed"));
            if let Some(project) = ctx.projects.active_project() {
                print_project(&project);
            }
            Ok(())
        }
        PollOutcome::Failed { message } | PollOutcome::RequestFailed { message } => {
            spinner.abandon_with_message(format!("Job {job_id} failed"));
            bail!(message)
        }
        PollOutcome::TimedOut { attempts } => {
            spinner.abandon_with_message(format!("Gave up on job {job_id}"));
            bail!("Job {job_id} did not finish after {attempts} status checks")
        }
        PollOutcome::Cancelled => {
            spinner.abandon_with_message(format!("Job {job_id} cancelled"));
            bail!("Polling for job {job_id} was cancelled")
        }
    }
}

fn print_project(project: &Project) {
    println!("{}  [{}]", project.id, project.status.as_deref().unwrap_or("-"));
    println!("  {}", first_line(&project.raw_blueprint));
    if let Some(cost) = &project.total_cost {
        println!("  cost: {cost}");
    }
    for part in &project.parts {
        println!("  Part {}: {} ({})", part.part_number, part.title, part.id);
        for chapter in &part.chapters {
            println!(
                "    {}. {} ({}) [{}]",
                chapter.chapter_number,
                chapter.title,
                chapter.id,
                chapter.status.as_deref().unwrap_or("-"),
            );
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
