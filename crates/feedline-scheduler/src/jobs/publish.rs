use async_trait::async_trait;
use chrono::Utc;
use feedline_core::job::{JOB_COMPLETE, JobKind};
use feedline_core::publisher::PublishOutcome;
use tracing::info;

use crate::context::JobContext;
use crate::error::JobError;
use crate::job::JobWork;

pub const BLOCKING_ERRORS: &str =
    "Could not publish this feed version because it contains blocking errors.";
pub const GTFS_PLUS_BLOCKING_ERRORS: &str =
    "Could not publish this feed version because it contains GTFS+ blocking errors.";

/// Sends the chain's version (or the latest stored one) to the external
/// publisher on behalf of the feed source's agency.
pub struct AutoPublishJob;

#[async_trait]
impl JobWork for AutoPublishJob {
    fn kind(&self) -> JobKind {
        JobKind::AutoPublish
    }

    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError> {
        let property = &ctx.services.publisher_property;
        let agency = ctx
            .repos()
            .properties
            .find_property(ctx.feed_source.id, &property.resource_type, &property.name)
            .await?
            .filter(|p| !p.value.trim().is_empty())
            .ok_or_else(|| {
                JobError::Configuration(format!(
                    "Feed source {} has no {} {} property. Cannot publish.",
                    ctx.feed_source.name, property.resource_type, property.name
                ))
            })?;
        let Some(publisher) = ctx.services.publisher.clone() else {
            return Err(JobError::Configuration(
                "No external publisher is configured.".to_string(),
            ));
        };

        let mut version = ctx
            .current_version()
            .await?
            .ok_or_else(|| JobError::Content("Feed source has no versions to publish.".to_string()))?;
        let Some(validation) = &version.validation else {
            return Err(JobError::Content(
                "Feed version has not been validated.".to_string(),
            ));
        };
        if validation.blocking_error_count > 0 {
            return Err(JobError::Content(BLOCKING_ERRORS.to_string()));
        }
        if validation.gtfs_plus_blocking_error_count > 0 {
            return Err(JobError::Content(GTFS_PLUS_BLOCKING_ERRORS.to_string()));
        }

        match publisher.submit(&agency.value, &version, &ctx.actor).await? {
            PublishOutcome::Accepted => {}
            PublishOutcome::Rejected { reason } => {
                return Err(JobError::Transient(format!(
                    "External publisher rejected the feed version: {}",
                    reason
                )));
            }
        }

        version.sent_to_external_publisher = Some(Utc::now());
        version.sent_by = Some(ctx.actor.clone());
        ctx.repos().feed_versions.save_feed_version(&version).await?;
        info!(
            feed_version_id = %version.id,
            agency = %agency.value,
            actor = %ctx.actor,
            "Feed version sent to external publisher"
        );

        if ctx.new_version.as_ref().is_some_and(|v| v.id == version.id) {
            ctx.new_version = Some(version);
        }
        Ok(JOB_COMPLETE.to_string())
    }
}
