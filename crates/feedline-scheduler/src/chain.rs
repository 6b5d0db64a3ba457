//! Guard-gated job sequences.

use feedline_core::job::{JOB_COMPLETE, Job, JobKind, JobState};
use tracing::{debug, info, warn};

use crate::context::JobContext;
use crate::job::{JobWork, run_job};
use crate::jobs::{AutoDeployJob, AutoPublishJob, FetchFeedJob, StoreFeedVersionJob, ValidateFeedJob};
use crate::tracker::JobTracker;

type Guard = Box<dyn Fn(&JobContext) -> bool + Send + Sync>;
type Factory = Box<dyn Fn() -> Box<dyn JobWork> + Send + Sync>;

struct Stage {
    guard: Guard,
    factory: Factory,
}

/// An ordered list of (guard, job factory) stages run under one root job.
///
/// A stage whose guard is false is never built, so it does not show up in
/// the root's subjobs. A failed subjob ends the chain.
pub struct JobChain {
    kind: JobKind,
    stages: Vec<Stage>,
}

impl JobChain {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            stages: Vec::new(),
        }
    }

    /// Stage that always runs.
    pub fn then<F>(self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn JobWork> + Send + Sync + 'static,
    {
        self.then_if(|_| true, factory)
    }

    /// Stage that runs only when `guard` holds once the previous stage is
    /// done.
    pub fn then_if<G, F>(mut self, guard: G, factory: F) -> Self
    where
        G: Fn(&JobContext) -> bool + Send + Sync + 'static,
        F: Fn() -> Box<dyn JobWork> + Send + Sync + 'static,
    {
        self.stages.push(Stage {
            guard: Box::new(guard),
            factory: Box::new(factory),
        });
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(&self, ctx: &mut JobContext) -> Job {
        self.execute(ctx, None).await
    }

    /// Like [`JobChain::run`], publishing the root job to `tracker` as each
    /// stage finishes.
    pub async fn run_tracked(&self, ctx: &mut JobContext, tracker: &JobTracker) -> Job {
        self.execute(ctx, Some(tracker)).await
    }

    async fn execute(&self, ctx: &mut JobContext, tracker: Option<&JobTracker>) -> Job {
        let mut root = Job::new(self.kind, Some(ctx.feed_source.id));
        root.status.start();
        if let Some(tracker) = tracker {
            tracker.record(&root).await;
        }
        info!(job_id = %root.id, kind = %root.kind, feed_source_id = %ctx.feed_source.id, "Running job chain");

        for (index, stage) in self.stages.iter().enumerate() {
            if root.last_sub_job().is_some_and(|job| !job.succeeded()) {
                break;
            }
            if !(stage.guard)(&*ctx) {
                debug!(job_id = %root.id, stage = index, "Stage guard not met");
                continue;
            }

            let work = (stage.factory)();
            let sub_job = run_job(work.as_ref(), ctx).await;
            root.sub_jobs.push(sub_job);
            if let Some(tracker) = tracker {
                tracker.record(&root).await;
            }
        }

        finish_root(&mut root);
        match root.status.state {
            JobState::Failed => {
                warn!(job_id = %root.id, message = %root.status.message, "Job chain failed")
            }
            _ => info!(job_id = %root.id, message = %root.status.message, "Job chain finished"),
        }
        if let Some(tracker) = tracker {
            tracker.record(&root).await;
        }
        root
    }
}

fn finish_root(root: &mut Job) {
    if let Some(failed) = root.sub_jobs.iter().find(|job| !job.succeeded()) {
        let message = failed.status.message.clone();
        root.status.fail(message);
        return;
    }
    let message = root
        .last_sub_job()
        .map(|job| job.status.message.clone())
        .unwrap_or_else(|| JOB_COMPLETE.to_string());
    root.status.succeed(message);
}

fn has_new_version(ctx: &JobContext) -> bool {
    ctx.new_version.is_some()
}

fn should_auto_publish(ctx: &JobContext) -> bool {
    has_new_version(ctx) && ctx.feed_source.auto_publish
}

fn should_auto_deploy(ctx: &JobContext) -> bool {
    has_new_version(ctx)
        && ctx.feed_source.deployable
        && ctx.project.as_ref().is_some_and(|p| p.auto_deploy)
}

/// Validate, then auto-publish and auto-deploy when configured. Shared tail
/// of the fetch and upload chains.
fn with_processing_stages(chain: JobChain) -> JobChain {
    chain
        .then_if(has_new_version, || Box::new(ValidateFeedJob))
        .then_if(should_auto_publish, || Box::new(AutoPublishJob))
        .then_if(should_auto_deploy, || Box::new(AutoDeployJob))
}

/// Chain run by the fetch timers.
pub fn fetch_chain() -> JobChain {
    with_processing_stages(JobChain::new(JobKind::ProcessFeed).then(|| Box::new(FetchFeedJob)))
}

/// Chain run for a manually uploaded feed file, taken from
/// [`JobContext::contents`].
pub fn upload_chain() -> JobChain {
    with_processing_stages(
        JobChain::new(JobKind::ProcessFeed).then(|| Box::new(StoreFeedVersionJob)),
    )
}

/// Publish the latest version on its own.
pub fn publish_chain() -> JobChain {
    JobChain::new(JobKind::AutoPublish).then(|| Box::new(AutoPublishJob))
}
