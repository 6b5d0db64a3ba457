use async_trait::async_trait;
use feedline_core::feed::RetrievalMethod;
use feedline_core::job::JobKind;
use tracing::info;

use super::create_version;
use crate::context::JobContext;
use crate::error::JobError;
use crate::job::JobWork;

/// Stores a manually uploaded feed file as a new version.
pub struct StoreFeedVersionJob;

#[async_trait]
impl JobWork for StoreFeedVersionJob {
    fn kind(&self) -> JobKind {
        JobKind::StoreFeedVersion
    }

    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError> {
        let contents = ctx
            .contents
            .take()
            .ok_or_else(|| JobError::Content("No feed file was uploaded.".to_string()))?;
        if contents.is_empty() {
            return Err(JobError::Content("Uploaded feed file is empty.".to_string()));
        }

        let version = create_version(ctx, contents, RetrievalMethod::Manual)
            .await?
            .ok_or_else(|| {
                JobError::Content(
                    "Uploaded feed file is identical to the latest version.".to_string(),
                )
            })?;

        info!(
            feed_source_id = %ctx.feed_source.id,
            feed_version_id = %version.id,
            version = version.version,
            "Stored uploaded feed version"
        );
        Ok(format!(
            "Stored version {} of {}.",
            version.version, ctx.feed_source.name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::run_job;
    use crate::testing::Harness;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_upload_creates_manual_version() {
        let harness = Harness::new().await;
        let mut ctx = harness.context().await;
        ctx.contents = Some(Bytes::from_static(b"uploaded"));

        let job = run_job(&StoreFeedVersionJob, &mut ctx).await;
        assert!(job.succeeded());
        let version = ctx.new_version.unwrap();
        assert_eq!(version.retrieval_method, RetrievalMethod::Manual);
        assert_eq!(version.size, 8);
    }

    #[tokio::test]
    async fn test_duplicate_upload_is_rejected() {
        let harness = Harness::new().await;
        let mut ctx = harness.context().await;
        ctx.contents = Some(Bytes::from_static(b"uploaded"));
        run_job(&StoreFeedVersionJob, &mut ctx).await;

        let mut ctx = harness.context().await;
        ctx.contents = Some(Bytes::from_static(b"uploaded"));
        let job = run_job(&StoreFeedVersionJob, &mut ctx).await;
        assert!(job.status.error);
        assert_eq!(
            job.status.message,
            "Uploaded feed file is identical to the latest version."
        );
    }

    #[tokio::test]
    async fn test_missing_upload_fails() {
        let harness = Harness::new().await;
        let mut ctx = harness.context().await;

        let job = run_job(&StoreFeedVersionJob, &mut ctx).await;
        assert_eq!(job.status.message, "No feed file was uploaded.");
    }
}
