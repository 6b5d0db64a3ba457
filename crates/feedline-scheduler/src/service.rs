//! The scheduling service object: fetch timers plus the completion poller.

use bytes::Bytes;
use feedline_core::ResourceId;
use feedline_core::feed::FeedSource;
use feedline_core::job::Job;
use feedline_core::project::Project;
use feedline_db::DbResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::Services;
use crate::runner::JobRunner;
use crate::scheduler::FeedScheduler;
use crate::tracker::JobTracker;
use crate::updater::FeedUpdater;

/// Built once at start-up and shut down explicitly.
///
/// The configuration layer calls the `*_saved` / `*_deleted` hooks so the
/// timers follow every change; nothing here polls for drift.
pub struct FeedlineService {
    runner: Arc<JobRunner>,
    scheduler: FeedScheduler,
    updater: Option<Arc<FeedUpdater>>,
    poll_period: Option<Duration>,
    token: CancellationToken,
    updater_task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedlineService {
    pub fn new(services: Arc<Services>) -> Self {
        let token = CancellationToken::new();
        let runner = Arc::new(JobRunner::new(services, Arc::new(JobTracker::new())));
        Self {
            scheduler: FeedScheduler::new(runner.clone(), token.child_token()),
            runner,
            updater: None,
            poll_period: None,
            token,
            updater_task: Mutex::new(None),
        }
    }

    /// Poll for publish completions every `period` once started.
    pub fn with_updater(mut self, updater: Arc<FeedUpdater>, period: Duration) -> Self {
        self.updater = Some(updater);
        self.poll_period = Some(period);
        self
    }

    /// Updater reachable through [`FeedlineService::check_published`] only.
    pub fn with_manual_updater(mut self, updater: Arc<FeedUpdater>) -> Self {
        self.updater = Some(updater);
        self.poll_period = None;
        self
    }

    /// Arm timers for every stored feed source and project and start the
    /// completion poller.
    pub async fn start(&self) -> DbResult<()> {
        let repos = &self.runner.services().repos;
        let mut armed = 0;
        for source in repos.feed_sources.list_feed_sources().await? {
            if self.scheduler.schedule(&source).await {
                armed += 1;
            }
        }
        for project in repos.projects.list_projects().await? {
            self.scheduler.schedule_project(&project).await;
        }

        if let (Some(updater), Some(period)) = (&self.updater, self.poll_period) {
            let task = tokio::spawn(updater.clone().run(period, self.token.child_token()));
            *self.updater_task.lock().await = Some(task);
        }
        info!(
            feed_timers = armed,
            polling = self.poll_period.is_some(),
            "Feedline service started"
        );
        Ok(())
    }

    /// Persist a created or edited feed source and reschedule it.
    pub async fn feed_source_saved(&self, source: &FeedSource) -> DbResult<()> {
        self.runner
            .services()
            .repos
            .feed_sources
            .save_feed_source(source)
            .await?;
        self.scheduler.schedule(source).await;
        Ok(())
    }

    pub async fn feed_source_deleted(&self, feed_source_id: ResourceId) -> DbResult<()> {
        self.scheduler.unschedule(feed_source_id).await;
        self.runner
            .services()
            .repos
            .feed_sources
            .delete_feed_source(feed_source_id)
            .await
    }

    /// Persist a created or edited project and reschedule its daily fetch.
    pub async fn project_saved(&self, project: &Project) -> DbResult<()> {
        self.runner.services().repos.projects.save_project(project).await?;
        self.scheduler.schedule_project(project).await;
        Ok(())
    }

    /// Delete a project with its feed sources and cancel all their timers.
    pub async fn project_deleted(&self, project_id: ResourceId) -> DbResult<()> {
        let repos = &self.runner.services().repos;
        for source in repos.feed_sources.list_feed_sources_by_project(project_id).await? {
            self.scheduler.unschedule(source.id).await;
        }
        self.scheduler.unschedule_project(project_id).await;
        repos.projects.delete_project(project_id).await
    }

    /// Fetch a feed source now, outside its timer.
    pub async fn fetch_now(&self, feed_source_id: ResourceId, actor: &str) -> Job {
        self.runner.run_fetch(feed_source_id, actor).await
    }

    pub async fn upload(&self, feed_source_id: ResourceId, contents: Bytes, actor: &str) -> Job {
        self.runner.run_upload(feed_source_id, contents, actor).await
    }

    pub async fn publish(&self, feed_source_id: ResourceId, actor: &str) -> Job {
        self.runner.run_publish(feed_source_id, actor).await
    }

    /// Run one completion poll. Empty when no updater is configured.
    pub async fn check_published(&self) -> HashMap<String, String> {
        match &self.updater {
            Some(updater) => updater.tick().await,
            None => HashMap::new(),
        }
    }

    pub fn jobs(&self) -> &Arc<JobTracker> {
        self.runner.tracker()
    }

    pub fn scheduler(&self) -> &FeedScheduler {
        &self.scheduler
    }

    /// Stop every timer and the poller, letting running chains finish.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.scheduler.shutdown().await;
        if let Some(task) = self.updater_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Feed updater task ended abnormally");
            }
        }
        info!("Feedline service stopped");
    }
}
