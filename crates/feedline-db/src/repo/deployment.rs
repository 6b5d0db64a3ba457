//! Deployment repository.

use async_trait::async_trait;
use feedline_core::ResourceId;
use feedline_core::project::Deployment;

use crate::memory::{MemoryStore, sorted};
use crate::{DbError, DbResult};

#[async_trait]
pub trait DeploymentRepo: Send + Sync {
    /// Insert or replace.
    async fn save_deployment(&self, deployment: &Deployment) -> DbResult<()>;
    async fn get_deployment(&self, id: ResourceId) -> DbResult<Deployment>;
    async fn find_deployment(&self, id: ResourceId) -> DbResult<Option<Deployment>>;
    async fn list_deployments(&self, project_id: ResourceId) -> DbResult<Vec<Deployment>>;
}

#[async_trait]
impl DeploymentRepo for MemoryStore {
    async fn save_deployment(&self, deployment: &Deployment) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.deployments.insert(deployment.id, deployment.clone());
        Ok(())
    }

    async fn get_deployment(&self, id: ResourceId) -> DbResult<Deployment> {
        self.find_deployment(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("deployment {}", id)))
    }

    async fn find_deployment(&self, id: ResourceId) -> DbResult<Option<Deployment>> {
        let tables = self.tables.read().await;
        Ok(tables.deployments.get(&id).cloned())
    }

    async fn list_deployments(&self, project_id: ResourceId) -> DbResult<Vec<Deployment>> {
        let tables = self.tables.read().await;
        Ok(sorted(
            tables
                .deployments
                .values()
                .filter(|d| d.project_id == project_id),
            |d| d.id,
        ))
    }
}
