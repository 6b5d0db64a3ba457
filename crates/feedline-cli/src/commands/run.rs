//! One-shot commands against the stored state.

use anyhow::{Context, Result};
use bytes::Bytes;
use feedline_core::ResourceId;
use feedline_core::job::{Job, JobState};
use std::path::{Path, PathBuf};

use super::build_runtime;

/// Fetch a feed source, or store `file` as its next version, and print the
/// resulting job tree.
pub async fn run(
    config_path: &Path,
    state_path: &Path,
    feed_source: &str,
    file: Option<PathBuf>,
    actor: &str,
) -> Result<()> {
    let id = parse_id(feed_source)?;
    let runtime = build_runtime(config_path, state_path).await?;

    let job = match file {
        Some(path) => {
            let contents = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
            runtime.service.upload(id, Bytes::from(contents), actor).await
        }
        None => runtime.service.fetch_now(id, actor).await,
    };

    runtime.store.save(state_path).await?;
    finish(&job)
}

/// Publish the latest version of a feed source.
pub async fn publish(config_path: &Path, state_path: &Path, feed_source: &str, actor: &str) -> Result<()> {
    let id = parse_id(feed_source)?;
    let runtime = build_runtime(config_path, state_path).await?;
    let job = runtime.service.publish(id, actor).await;
    runtime.store.save(state_path).await?;
    finish(&job)
}

/// Poll the completion markers once and list what changed.
pub async fn check_published(config_path: &Path, state_path: &Path) -> Result<()> {
    let runtime = build_runtime(config_path, state_path).await?;
    let detected = runtime.service.check_published().await;
    runtime.store.save(state_path).await?;

    if detected.is_empty() {
        println!("No new publish completions");
    } else {
        let mut keys: Vec<_> = detected.iter().collect();
        keys.sort();
        for (key, etag) in keys {
            println!("{} (etag {})", key, etag);
        }
    }
    Ok(())
}

fn parse_id(value: &str) -> Result<ResourceId> {
    value
        .parse()
        .with_context(|| format!("Invalid feed source ID: {}", value))
}

fn finish(job: &Job) -> Result<()> {
    print!("{}", render_job(job, 0));
    if job.status.state == JobState::Succeeded {
        Ok(())
    } else {
        anyhow::bail!("{}", job.status.message);
    }
}

fn render_job(job: &Job, depth: usize) -> String {
    let marker = match job.status.state {
        JobState::Succeeded => "✓",
        JobState::Failed => "✗",
        JobState::Cancelled => "⊘",
        JobState::Pending => "○",
        JobState::Running => "▶",
    };
    let mut out = format!(
        "{}{} {} - {}\n",
        "  ".repeat(depth),
        marker,
        job.kind,
        job.status.message
    );
    for sub_job in &job.sub_jobs {
        out.push_str(&render_job(sub_job, depth + 1));
    }
    out
}
