//! In-memory document store.

use feedline_core::ResourceId;
use feedline_core::feed::{ExternalPublisherProperty, FeedSource, FeedVersion};
use feedline_core::project::{Deployment, Project};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::DbResult;
use crate::repo::Repos;

/// Serializable copy of every document in a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub feed_sources: Vec<FeedSource>,
    #[serde(default)]
    pub feed_versions: Vec<FeedVersion>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    #[serde(default)]
    pub properties: Vec<ExternalPublisherProperty>,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub projects: HashMap<ResourceId, Project>,
    pub feed_sources: HashMap<ResourceId, FeedSource>,
    pub feed_versions: HashMap<ResourceId, FeedVersion>,
    pub deployments: HashMap<ResourceId, Deployment>,
    pub properties: HashMap<ResourceId, ExternalPublisherProperty>,
}

/// Document store holding every collection in memory.
///
/// Implements all repository traits; writes replace whole documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub(crate) tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tables = Tables {
            projects: snapshot.projects.into_iter().map(|d| (d.id, d)).collect(),
            feed_sources: snapshot.feed_sources.into_iter().map(|d| (d.id, d)).collect(),
            feed_versions: snapshot.feed_versions.into_iter().map(|d| (d.id, d)).collect(),
            deployments: snapshot.deployments.into_iter().map(|d| (d.id, d)).collect(),
            properties: snapshot.properties.into_iter().map(|d| (d.id, d)).collect(),
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Copy of the current contents, each collection sorted by id.
    pub async fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read().await;
        Snapshot {
            projects: sorted(tables.projects.values(), |d| d.id),
            feed_sources: sorted(tables.feed_sources.values(), |d| d.id),
            feed_versions: sorted(tables.feed_versions.values(), |d| d.id),
            deployments: sorted(tables.deployments.values(), |d| d.id),
            properties: sorted(tables.properties.values(), |d| d.id),
        }
    }

    /// Load a store from a JSON snapshot file. A missing file yields an
    /// empty store.
    pub async fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                info!(
                    path = %path.display(),
                    projects = snapshot.projects.len(),
                    feed_sources = snapshot.feed_sources.len(),
                    "Loaded snapshot"
                );
                Ok(Self::from_snapshot(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the current contents to `path`, replacing it atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(&self.snapshot().await)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        info!(path = %path.display(), "Saved snapshot");
        Ok(())
    }

    /// Repository bundle backed by this store.
    pub fn repos(self: &Arc<Self>) -> Repos {
        Repos {
            projects: self.clone(),
            feed_sources: self.clone(),
            feed_versions: self.clone(),
            deployments: self.clone(),
            properties: self.clone(),
        }
    }
}

pub(crate) fn sorted<'a, T, I, K>(items: I, key: K) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
    K: Fn(&T) -> ResourceId,
{
    let mut out: Vec<T> = items.cloned().collect();
    out.sort_by_key(|item| key(item));
    out
}
