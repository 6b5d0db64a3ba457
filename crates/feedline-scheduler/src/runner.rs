//! Entry points that build a context and run a chain for a feed source.

use bytes::Bytes;
use feedline_core::ResourceId;
use feedline_core::job::{Job, JobKind};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{JobChain, fetch_chain, publish_chain, upload_chain};
use crate::context::{JobContext, Services};
use crate::error::JobError;
use crate::job::panic_message;
use crate::tracker::JobTracker;

/// Actor recorded for jobs started by timers.
pub const SCHEDULER_ACTOR: &str = "scheduler";

/// Runs chains against the shared services and records their root jobs.
pub struct JobRunner {
    services: Arc<Services>,
    tracker: Arc<JobTracker>,
}

impl JobRunner {
    pub fn new(services: Arc<Services>, tracker: Arc<JobTracker>) -> Self {
        Self { services, tracker }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    /// Fetch the feed source's current definition and run the fetch chain.
    pub async fn run_fetch(&self, feed_source_id: ResourceId, actor: &str) -> Job {
        self.run(fetch_chain(), feed_source_id, actor, None).await
    }

    /// Fetch chain started by a timer.
    ///
    /// A feed source deleted after the timer fired gives a cancelled root
    /// job. A panic outside the subjobs gives a failed root job.
    pub async fn run_scheduled_fetch(&self, feed_source_id: ResourceId, actor: &str) -> Job {
        let chain = fetch_chain();
        let kind = chain.kind();
        let run = async {
            match JobContext::find(self.services.clone(), feed_source_id, actor).await {
                Ok(Some(mut ctx)) => chain.run_tracked(&mut ctx, &self.tracker).await,
                Ok(None) => self.cancelled_root(kind, feed_source_id).await,
                Err(err) => self.failed_root(kind, feed_source_id, err).await,
            }
        };
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(job) => job,
            Err(panic) => {
                let err = JobError::Unexpected(format!(
                    "Job panicked: {}",
                    panic_message(panic.as_ref())
                ));
                self.failed_root(kind, feed_source_id, err).await
            }
        }
    }

    /// Store an uploaded feed file and process it.
    pub async fn run_upload(&self, feed_source_id: ResourceId, contents: Bytes, actor: &str) -> Job {
        self.run(upload_chain(), feed_source_id, actor, Some(contents))
            .await
    }

    /// Publish the latest version of a feed source.
    pub async fn run_publish(&self, feed_source_id: ResourceId, actor: &str) -> Job {
        self.run(publish_chain(), feed_source_id, actor, None).await
    }

    /// Run the fetch chain for every auto-fetched feed source of a project.
    pub async fn run_project_fetch(&self, project_id: ResourceId, actor: &str) -> Vec<Job> {
        let sources = match self
            .services
            .repos
            .feed_sources
            .list_feed_sources_by_project(project_id)
            .await
        {
            Ok(sources) => sources,
            Err(e) => {
                warn!(%project_id, error = %e, "Could not list feed sources for project fetch");
                return Vec::new();
            }
        };

        let mut jobs = Vec::new();
        for source in sources.iter().filter(|s| s.is_auto_fetch_eligible()) {
            jobs.push(self.run_scheduled_fetch(source.id, actor).await);
        }
        info!(%project_id, feeds = jobs.len(), "Project fetch finished");
        jobs
    }

    async fn run(
        &self,
        chain: JobChain,
        feed_source_id: ResourceId,
        actor: &str,
        contents: Option<Bytes>,
    ) -> Job {
        match JobContext::load(self.services.clone(), feed_source_id, actor).await {
            Ok(mut ctx) => {
                ctx.contents = contents;
                chain.run_tracked(&mut ctx, &self.tracker).await
            }
            Err(err) => self.failed_root(chain.kind(), feed_source_id, err).await,
        }
    }

    async fn failed_root(&self, kind: JobKind, feed_source_id: ResourceId, err: JobError) -> Job {
        let mut root = Job::new(kind, Some(feed_source_id));
        root.status.start();
        root.status.fail(err.to_string());
        warn!(job_id = %root.id, %feed_source_id, error = %err, "Job chain could not start");
        self.tracker.record(&root).await;
        root
    }

    async fn cancelled_root(&self, kind: JobKind, feed_source_id: ResourceId) -> Job {
        let mut root = Job::new(kind, Some(feed_source_id));
        root.status.start();
        root.status.cancel(format!(
            "Feed source {} was deleted. Skipping scheduled fetch.",
            feed_source_id
        ));
        info!(job_id = %root.id, %feed_source_id, "Feed source deleted before scheduled fetch");
        self.tracker.record(&root).await;
        root
    }
}
