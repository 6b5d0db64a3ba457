use async_trait::async_trait;
use feedline_core::job::{JOB_COMPLETE, JobKind};
use tracing::info;

use crate::context::JobContext;
use crate::error::JobError;
use crate::job::JobWork;

/// Runs the validator on the chain's new version and stores the summary.
///
/// Blocking errors in the feed do not fail this job; the publish and deploy
/// stages decide what to do with them.
pub struct ValidateFeedJob;

#[async_trait]
impl JobWork for ValidateFeedJob {
    fn kind(&self) -> JobKind {
        JobKind::ValidateFeed
    }

    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError> {
        let Some(mut version) = ctx.new_version.clone() else {
            return Err(JobError::Content("No feed version to validate.".to_string()));
        };
        let Some(contents) = ctx.contents.clone() else {
            return Err(JobError::Content(
                "Feed contents are not available for validation.".to_string(),
            ));
        };

        let summary = ctx.services.validator.validate(&version, &contents).await?;
        info!(
            feed_version_id = %version.id,
            blocking = summary.blocking_error_count,
            gtfs_plus_blocking = summary.gtfs_plus_blocking_error_count,
            high_severity = summary.high_severity_error_count,
            "Feed version validated"
        );

        version.validation = Some(summary);
        ctx.repos().feed_versions.save_feed_version(&version).await?;
        ctx.new_version = Some(version);
        Ok(JOB_COMPLETE.to_string())
    }
}
