//! The jobs a chain is made of.

mod deploy;
mod fetch;
mod publish;
mod store;
mod validate;

pub use deploy::{AutoDeployJob, CRITICAL_ERRORS, NEVER_DEPLOYED, PINNED_DEPLOYMENT_MISSING};
pub use fetch::{FetchFeedJob, NOT_MODIFIED};
pub use publish::{AutoPublishJob, BLOCKING_ERRORS, GTFS_PLUS_BLOCKING_ERRORS};
pub use store::StoreFeedVersionJob;
pub use validate::ValidateFeedJob;

use bytes::Bytes;
use feedline_core::feed::{FeedVersion, RetrievalMethod};

use crate::context::JobContext;
use crate::error::JobError;

/// MD5 hex digest used to recognise unchanged feed files.
pub(crate) fn content_hash(contents: &[u8]) -> String {
    hex::encode(md5::compute(contents).0)
}

/// Store `contents` as the next version of the context's feed source, unless
/// they match the latest version. Returns `None` for unchanged contents.
pub(crate) async fn create_version(
    ctx: &mut JobContext,
    contents: Bytes,
    method: RetrievalMethod,
) -> Result<Option<FeedVersion>, JobError> {
    let hash = content_hash(&contents);
    let latest = ctx
        .repos()
        .feed_versions
        .latest_feed_version(ctx.feed_source.id)
        .await?;
    if latest.as_ref().is_some_and(|v| v.hash == hash) {
        return Ok(None);
    }

    let number = latest.map_or(1, |v| v.version + 1);
    let version = FeedVersion::new(
        &ctx.feed_source,
        number,
        hash,
        contents.len() as u64,
        method,
    );
    ctx.repos().feed_versions.save_feed_version(&version).await?;

    ctx.new_version = Some(version.clone());
    ctx.contents = Some(contents);
    Ok(Some(version))
}
