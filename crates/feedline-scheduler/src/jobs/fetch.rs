use async_trait::async_trait;
use chrono::Utc;
use feedline_core::feed::RetrievalMethod;
use feedline_core::fetcher::FetchOutcome;
use feedline_core::job::JobKind;
use tracing::info;

use super::create_version;
use crate::context::JobContext;
use crate::error::JobError;
use crate::job::JobWork;

pub const NOT_MODIFIED: &str = "Feed has not been modified since last fetch.";

/// Downloads the feed and stores it as a new version when it changed.
pub struct FetchFeedJob;

impl FetchFeedJob {
    async fn touch_last_fetched(ctx: &mut JobContext) -> Result<(), JobError> {
        let now = Utc::now();
        // Reload so configuration edits made during the download survive.
        let mut source = ctx
            .repos()
            .feed_sources
            .find_feed_source(ctx.feed_source.id)
            .await?
            .unwrap_or_else(|| ctx.feed_source.clone());
        source.last_fetched = Some(now);
        ctx.repos().feed_sources.save_feed_source(&source).await?;
        ctx.feed_source = source;
        Ok(())
    }
}

#[async_trait]
impl JobWork for FetchFeedJob {
    fn kind(&self) -> JobKind {
        JobKind::FetchFeed
    }

    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError> {
        let outcome = ctx.services.fetcher.fetch(&ctx.feed_source).await?;

        let message = match outcome {
            FetchOutcome::NotModified => NOT_MODIFIED.to_string(),
            FetchOutcome::Fetched(feed) => {
                match create_version(ctx, feed.contents, RetrievalMethod::Automatic).await? {
                    None => NOT_MODIFIED.to_string(),
                    Some(version) => {
                        info!(
                            feed_source_id = %ctx.feed_source.id,
                            feed_version_id = %version.id,
                            version = version.version,
                            "Stored new feed version"
                        );
                        format!(
                            "Fetched version {} of {}.",
                            version.version, ctx.feed_source.name
                        )
                    }
                }
            }
        };

        Self::touch_last_fetched(ctx).await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::run_job;
    use crate::testing::Harness;
    use feedline_core::job::JobState;

    #[tokio::test]
    async fn test_new_contents_create_next_version() {
        let harness = Harness::new().await;
        harness.fetcher.serve(b"feed-v1");
        let mut ctx = harness.context().await;

        let job = run_job(&FetchFeedJob, &mut ctx).await;
        assert_eq!(job.status.state, JobState::Succeeded);
        let version = ctx.new_version.clone().unwrap();
        assert_eq!(version.version, 1);
        assert_eq!(version.retrieval_method, RetrievalMethod::Automatic);
        assert_eq!(ctx.contents.as_deref(), Some(&b"feed-v1"[..]));

        harness.fetcher.serve(b"feed-v2");
        let mut ctx = harness.context().await;
        run_job(&FetchFeedJob, &mut ctx).await;
        assert_eq!(ctx.new_version.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_unchanged_contents_create_nothing() {
        let harness = Harness::new().await;
        harness.fetcher.serve(b"same");
        let mut ctx = harness.context().await;
        run_job(&FetchFeedJob, &mut ctx).await;

        let mut ctx = harness.context().await;
        let job = run_job(&FetchFeedJob, &mut ctx).await;
        assert!(job.succeeded());
        assert_eq!(job.status.message, NOT_MODIFIED);
        assert!(ctx.new_version.is_none());

        let stored = harness.source().await;
        assert!(stored.last_fetched.is_some());
    }

    #[tokio::test]
    async fn test_not_modified() {
        let harness = Harness::new().await;
        harness.fetcher.not_modified();
        let mut ctx = harness.context().await;

        let job = run_job(&FetchFeedJob, &mut ctx).await;
        assert_eq!(job.status.message, NOT_MODIFIED);
        assert!(harness.source().await.last_fetched.is_some());
    }

    #[tokio::test]
    async fn test_fetch_error_fails_job() {
        let harness = Harness::new().await;
        harness.fetcher.fail("connection refused");
        let mut ctx = harness.context().await;

        let job = run_job(&FetchFeedJob, &mut ctx).await;
        assert!(job.status.error);
        assert_eq!(job.status.message, "fetch failed: connection refused");
        assert!(harness.source().await.last_fetched.is_none());
    }
}
