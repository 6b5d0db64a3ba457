//! Project repository.

use async_trait::async_trait;
use feedline_core::ResourceId;
use feedline_core::project::Project;

use crate::memory::{MemoryStore, sorted};
use crate::{DbError, DbResult};

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Insert or replace.
    async fn save_project(&self, project: &Project) -> DbResult<()>;
    async fn get_project(&self, id: ResourceId) -> DbResult<Project>;
    async fn find_project(&self, id: ResourceId) -> DbResult<Option<Project>>;
    async fn list_projects(&self) -> DbResult<Vec<Project>>;
    /// Removes the project with its feed sources and deployments.
    async fn delete_project(&self, id: ResourceId) -> DbResult<()>;
}

#[async_trait]
impl ProjectRepo for MemoryStore {
    async fn save_project(&self, project: &Project) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: ResourceId) -> DbResult<Project> {
        self.find_project(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))
    }

    async fn find_project(&self, id: ResourceId) -> DbResult<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> DbResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(sorted(tables.projects.values(), |p| p.id))
    }

    async fn delete_project(&self, id: ResourceId) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.projects.remove(&id);

        let sources: Vec<ResourceId> = tables
            .feed_sources
            .values()
            .filter(|s| s.project_id == id)
            .map(|s| s.id)
            .collect();
        for source_id in &sources {
            tables.feed_sources.remove(source_id);
        }
        tables
            .feed_versions
            .retain(|_, v| !sources.contains(&v.feed_source_id));
        tables
            .properties
            .retain(|_, p| !sources.contains(&p.feed_source_id));
        tables.deployments.retain(|_, d| d.project_id != id);
        Ok(())
    }
}
