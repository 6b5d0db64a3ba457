//! External publisher property repository.

use async_trait::async_trait;
use feedline_core::ResourceId;
use feedline_core::feed::ExternalPublisherProperty;

use crate::DbResult;
use crate::memory::MemoryStore;

#[async_trait]
pub trait ExternalPropertyRepo: Send + Sync {
    /// Insert, or replace the property with the same (source, type, name).
    async fn save_property(&self, property: &ExternalPublisherProperty) -> DbResult<()>;
    async fn find_property(
        &self,
        feed_source_id: ResourceId,
        resource_type: &str,
        name: &str,
    ) -> DbResult<Option<ExternalPublisherProperty>>;
    /// Ids of the feed sources whose property `resource_type.name` equals
    /// `value`.
    async fn feed_sources_with_property(
        &self,
        resource_type: &str,
        name: &str,
        value: &str,
    ) -> DbResult<Vec<ResourceId>>;
}

#[async_trait]
impl ExternalPropertyRepo for MemoryStore {
    async fn save_property(&self, property: &ExternalPublisherProperty) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.properties.retain(|id, p| {
            *id == property.id
                || !(p.feed_source_id == property.feed_source_id
                    && p.resource_type == property.resource_type
                    && p.name == property.name)
        });
        tables.properties.insert(property.id, property.clone());
        Ok(())
    }

    async fn find_property(
        &self,
        feed_source_id: ResourceId,
        resource_type: &str,
        name: &str,
    ) -> DbResult<Option<ExternalPublisherProperty>> {
        let tables = self.tables.read().await;
        Ok(tables
            .properties
            .values()
            .find(|p| {
                p.feed_source_id == feed_source_id
                    && p.resource_type == resource_type
                    && p.name == name
            })
            .cloned())
    }

    async fn feed_sources_with_property(
        &self,
        resource_type: &str,
        name: &str,
        value: &str,
    ) -> DbResult<Vec<ResourceId>> {
        let tables = self.tables.read().await;
        let mut ids: Vec<ResourceId> = tables
            .properties
            .values()
            .filter(|p| p.resource_type == resource_type && p.name == name && p.value == value)
            .map(|p| p.feed_source_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
