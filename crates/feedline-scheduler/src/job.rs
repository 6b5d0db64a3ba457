//! Running a single job.

use async_trait::async_trait;
use feedline_core::job::{Job, JobKind};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::context::JobContext;
use crate::error::JobError;

/// The work behind a job.
#[async_trait]
pub trait JobWork: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Do the work. The returned string becomes the success message.
    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError>;
}

/// Run `work` as a new job and return it in a terminal state.
///
/// Errors and panics are captured in the job status; nothing escapes.
pub async fn run_job(work: &dyn JobWork, ctx: &mut JobContext) -> Job {
    let mut job = Job::new(work.kind(), Some(ctx.feed_source.id));
    job.status.start();
    debug!(job_id = %job.id, kind = %job.kind, feed_source_id = %ctx.feed_source.id, "Job started");

    let outcome = AssertUnwindSafe(work.execute(ctx)).catch_unwind().await;
    let result = match outcome {
        Ok(result) => result,
        Err(panic) => Err(JobError::Unexpected(format!(
            "Job panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    match result {
        Ok(message) => {
            debug!(job_id = %job.id, kind = %job.kind, %message, "Job succeeded");
            job.status.succeed(message);
        }
        Err(err) => {
            warn!(
                job_id = %job.id,
                kind = %job.kind,
                feed_source_id = %ctx.feed_source.id,
                retryable = err.is_retryable(),
                error = %err,
                "Job failed"
            );
            job.status.fail(err.to_string());
        }
    }
    job
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
