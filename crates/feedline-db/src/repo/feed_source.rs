//! Feed source repository.

use async_trait::async_trait;
use feedline_core::ResourceId;
use feedline_core::feed::FeedSource;

use crate::memory::{MemoryStore, sorted};
use crate::{DbError, DbResult};

#[async_trait]
pub trait FeedSourceRepo: Send + Sync {
    /// Insert or replace.
    async fn save_feed_source(&self, source: &FeedSource) -> DbResult<()>;
    async fn get_feed_source(&self, id: ResourceId) -> DbResult<FeedSource>;
    async fn find_feed_source(&self, id: ResourceId) -> DbResult<Option<FeedSource>>;
    async fn list_feed_sources(&self) -> DbResult<Vec<FeedSource>>;
    async fn list_feed_sources_by_project(
        &self,
        project_id: ResourceId,
    ) -> DbResult<Vec<FeedSource>>;
    /// Removes the source with its versions and properties.
    async fn delete_feed_source(&self, id: ResourceId) -> DbResult<()>;
}

#[async_trait]
impl FeedSourceRepo for MemoryStore {
    async fn save_feed_source(&self, source: &FeedSource) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.feed_sources.insert(source.id, source.clone());
        Ok(())
    }

    async fn get_feed_source(&self, id: ResourceId) -> DbResult<FeedSource> {
        self.find_feed_source(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("feed source {}", id)))
    }

    async fn find_feed_source(&self, id: ResourceId) -> DbResult<Option<FeedSource>> {
        let tables = self.tables.read().await;
        Ok(tables.feed_sources.get(&id).cloned())
    }

    async fn list_feed_sources(&self) -> DbResult<Vec<FeedSource>> {
        let tables = self.tables.read().await;
        Ok(sorted(tables.feed_sources.values(), |s| s.id))
    }

    async fn list_feed_sources_by_project(
        &self,
        project_id: ResourceId,
    ) -> DbResult<Vec<FeedSource>> {
        let tables = self.tables.read().await;
        Ok(sorted(
            tables
                .feed_sources
                .values()
                .filter(|s| s.project_id == project_id),
            |s| s.id,
        ))
    }

    async fn delete_feed_source(&self, id: ResourceId) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.feed_sources.remove(&id);
        tables.feed_versions.retain(|_, v| v.feed_source_id != id);
        tables.properties.retain(|_, p| p.feed_source_id != id);
        Ok(())
    }
}
