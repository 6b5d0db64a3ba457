//! Job and job status types.
//!
//! A [`Job`] is plain data: execution lives in `feedline-scheduler`. Root jobs
//! are polled by operators through their [`JobStatus`]; subjobs are owned by
//! their parent and kept in execution order.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// Message reported by every job that finishes without a more specific one.
pub const JOB_COMPLETE: &str = "Job complete!";

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    #[display("process-feed")]
    ProcessFeed,
    #[display("fetch-feed")]
    FetchFeed,
    #[display("store-feed-version")]
    StoreFeedVersion,
    #[display("validate-feed")]
    ValidateFeed,
    #[display("auto-publish")]
    AutoPublish,
    #[display("auto-deploy")]
    AutoDeploy,
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[display("pending")]
    Pending,
    #[display("running")]
    Running,
    #[display("succeeded")]
    Succeeded,
    #[display("failed")]
    Failed,
    #[display("cancelled")]
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Status object read by the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub error: bool,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            error: false,
            message: "Waiting to begin job...".to_string(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.state = JobState::Running;
        self.message = "Running...".to_string();
        self.started_at = Some(Utc::now());
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.finish(JobState::Succeeded, false, message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.finish(JobState::Failed, true, message.into());
    }

    pub fn cancel(&mut self, message: impl Into<String>) {
        self.finish(JobState::Cancelled, false, message.into());
    }

    fn finish(&mut self, state: JobState, error: bool, message: String) {
        self.state = state;
        self.error = error;
        self.message = message;
        self.completed_at = Some(Utc::now());
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::pending()
    }
}

/// A unit of asynchronous work and the subjobs it ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: ResourceId,
    pub kind: JobKind,
    /// Feed source the job works on, if any.
    pub feed_source_id: Option<ResourceId>,
    pub status: JobStatus,
    pub sub_jobs: Vec<Job>,
}

impl Job {
    pub fn new(kind: JobKind, feed_source_id: Option<ResourceId>) -> Self {
        Self {
            id: ResourceId::new(),
            kind,
            feed_source_id,
            status: JobStatus::pending(),
            sub_jobs: Vec::new(),
        }
    }

    /// Last subjob actually appended.
    pub fn last_sub_job(&self) -> Option<&Job> {
        self.sub_jobs.last()
    }

    pub fn find_sub_job(&self, kind: JobKind) -> Option<&Job> {
        self.sub_jobs.iter().find(|job| job.kind == kind)
    }

    pub fn succeeded(&self) -> bool {
        self.status.state == JobState::Succeeded
    }
}
