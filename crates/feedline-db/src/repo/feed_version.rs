//! Feed version repository.

use async_trait::async_trait;
use feedline_core::ResourceId;
use feedline_core::feed::FeedVersion;

use crate::memory::{MemoryStore, sorted};
use crate::{DbError, DbResult};

#[async_trait]
pub trait FeedVersionRepo: Send + Sync {
    /// Insert or replace.
    async fn save_feed_version(&self, version: &FeedVersion) -> DbResult<()>;
    async fn get_feed_version(&self, id: ResourceId) -> DbResult<FeedVersion>;
    /// Highest version number of the source.
    async fn latest_feed_version(&self, feed_source_id: ResourceId)
    -> DbResult<Option<FeedVersion>>;
    /// Versions of the source, oldest first.
    async fn list_feed_versions(&self, feed_source_id: ResourceId) -> DbResult<Vec<FeedVersion>>;
    /// Versions of the given sources that were sent to the external
    /// publisher and are not yet processed, oldest send first.
    async fn awaiting_publish(&self, feed_source_ids: &[ResourceId]) -> DbResult<Vec<FeedVersion>>;
}

#[async_trait]
impl FeedVersionRepo for MemoryStore {
    async fn save_feed_version(&self, version: &FeedVersion) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.feed_versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn get_feed_version(&self, id: ResourceId) -> DbResult<FeedVersion> {
        let tables = self.tables.read().await;
        tables
            .feed_versions
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("feed version {}", id)))
    }

    async fn latest_feed_version(
        &self,
        feed_source_id: ResourceId,
    ) -> DbResult<Option<FeedVersion>> {
        let tables = self.tables.read().await;
        Ok(tables
            .feed_versions
            .values()
            .filter(|v| v.feed_source_id == feed_source_id)
            .max_by_key(|v| (v.version, v.id))
            .cloned())
    }

    async fn list_feed_versions(&self, feed_source_id: ResourceId) -> DbResult<Vec<FeedVersion>> {
        let tables = self.tables.read().await;
        let mut versions = sorted(
            tables
                .feed_versions
                .values()
                .filter(|v| v.feed_source_id == feed_source_id),
            |v| v.id,
        );
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn awaiting_publish(&self, feed_source_ids: &[ResourceId]) -> DbResult<Vec<FeedVersion>> {
        let tables = self.tables.read().await;
        let mut versions: Vec<FeedVersion> = tables
            .feed_versions
            .values()
            .filter(|v| feed_source_ids.contains(&v.feed_source_id) && v.is_awaiting_publish())
            .cloned()
            .collect();
        versions.sort_by_key(|v| (v.sent_to_external_publisher, v.id));
        Ok(versions)
    }
}
