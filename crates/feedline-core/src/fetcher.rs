//! Feed fetcher trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::feed::FeedSource;

/// A feed file downloaded from a source URL.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub contents: Bytes,
    /// `Last-Modified` reported by the server, if any.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of asking a source for its current feed.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The server reported no change since `FeedSource::last_fetched`.
    NotModified,
    Fetched(FetchedFeed),
}

/// Downloads feed files for automatic feed sources.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, source: &FeedSource) -> Result<FetchOutcome>;
}
