//! Recurring fetch timers, one per feed source and one per project.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use feedline_core::ResourceId;
use feedline_core::feed::FeedSource;
use feedline_core::project::Project;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::panic_message;
use crate::runner::{JobRunner, SCHEDULER_ACTOR};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
    period: Duration,
}

/// Owns the fetch timers.
///
/// Rescheduling cancels the previous timer before arming a new one, so a
/// feed source never has two. Cancelling a timer does not abort a chain it
/// already started.
pub struct FeedScheduler {
    runner: Arc<JobRunner>,
    token: CancellationToken,
    feeds: Mutex<HashMap<ResourceId, ScheduledTask>>,
    projects: Mutex<HashMap<ResourceId, ScheduledTask>>,
}

impl FeedScheduler {
    pub fn new(runner: Arc<JobRunner>, token: CancellationToken) -> Self {
        Self {
            runner,
            token,
            feeds: Mutex::new(HashMap::new()),
            projects: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the timer of `source`. Returns whether a timer is now armed.
    pub async fn schedule(&self, source: &FeedSource) -> bool {
        let mut feeds = self.feeds.lock().await;
        if let Some(previous) = feeds.remove(&source.id) {
            previous.token.cancel();
            debug!(feed_source_id = %source.id, "Cancelled previous fetch timer");
        }

        let period = match source.fetch_period() {
            Some(period) if source.is_auto_fetch_eligible() => period,
            _ => {
                debug!(feed_source_id = %source.id, "Feed source is not auto-fetched");
                return false;
            }
        };

        let token = self.token.child_token();
        let runner = self.runner.clone();
        let feed_source_id = source.id;
        let handle = spawn_timer(Instant::now() + period, period, token.clone(), move || {
            let runner = runner.clone();
            async move {
                runner.run_scheduled_fetch(feed_source_id, SCHEDULER_ACTOR).await;
            }
        });

        info!(feed_source_id = %source.id, period_secs = period.as_secs(), "Scheduled feed fetch");
        feeds.insert(
            source.id,
            ScheduledTask {
                token,
                handle,
                period,
            },
        );
        true
    }

    pub async fn unschedule(&self, feed_source_id: ResourceId) {
        if let Some(task) = self.feeds.lock().await.remove(&feed_source_id) {
            task.token.cancel();
            info!(%feed_source_id, "Unscheduled feed fetch");
        }
    }

    pub async fn is_scheduled(&self, feed_source_id: ResourceId) -> bool {
        self.feeds.lock().await.contains_key(&feed_source_id)
    }

    pub async fn scheduled_count(&self) -> usize {
        self.feeds.lock().await.len()
    }

    pub async fn period(&self, feed_source_id: ResourceId) -> Option<Duration> {
        self.feeds
            .lock()
            .await
            .get(&feed_source_id)
            .map(|task| task.period)
    }

    /// Replace the daily fetch timer of `project`. Returns whether a timer
    /// is now armed.
    pub async fn schedule_project(&self, project: &Project) -> bool {
        let mut projects = self.projects.lock().await;
        if let Some(previous) = projects.remove(&project.id) {
            previous.token.cancel();
        }
        if !project.auto_fetch_feeds {
            return false;
        }

        let now = Utc::now();
        let Some(next) = next_daily_run(now, project.auto_fetch_hour, project.auto_fetch_minute)
        else {
            warn!(
                project_id = %project.id,
                hour = project.auto_fetch_hour,
                minute = project.auto_fetch_minute,
                "Invalid daily fetch time"
            );
            return false;
        };
        let delay = (next - now).to_std().unwrap_or_default();

        let token = self.token.child_token();
        let runner = self.runner.clone();
        let project_id = project.id;
        let handle = spawn_timer(Instant::now() + delay, DAY, token.clone(), move || {
            let runner = runner.clone();
            async move {
                runner.run_project_fetch(project_id, SCHEDULER_ACTOR).await;
            }
        });

        info!(project_id = %project.id, next_run = %next, "Scheduled daily project fetch");
        projects.insert(
            project.id,
            ScheduledTask {
                token,
                handle,
                period: DAY,
            },
        );
        true
    }

    pub async fn unschedule_project(&self, project_id: ResourceId) {
        if let Some(task) = self.projects.lock().await.remove(&project_id) {
            task.token.cancel();
            info!(%project_id, "Unscheduled daily project fetch");
        }
    }

    pub async fn is_project_scheduled(&self, project_id: ResourceId) -> bool {
        self.projects.lock().await.contains_key(&project_id)
    }

    /// Cancel every timer and wait for chains already running to finish.
    pub async fn shutdown(&self) {
        let mut tasks: Vec<ScheduledTask> = self.feeds.lock().await.drain().map(|(_, t)| t).collect();
        tasks.extend(self.projects.lock().await.drain().map(|(_, t)| t));
        for task in &tasks {
            task.token.cancel();
        }
        for task in tasks {
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Fetch timer task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

fn spawn_timer<F, Fut>(start: Instant, period: Duration, token: CancellationToken, fire: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // Not raced against the token: a started chain runs to the end.
            if let Err(panic) = AssertUnwindSafe(fire()).catch_unwind().await {
                warn!(panic = panic_message(panic.as_ref()), "Timer firing panicked");
            }
        }
    })
}

/// Next occurrence of `hour:minute` UTC strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        Some(today)
    } else {
        Some(today + ChronoDuration::days(1))
    }
}
