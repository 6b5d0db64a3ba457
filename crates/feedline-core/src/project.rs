//! Projects and deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// A group of feed sources managed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ResourceId,
    pub name: String,
    /// Push new versions of deployable feeds to the pinned deployment.
    #[serde(default)]
    pub auto_deploy: bool,
    /// Fetch every automatic feed source once a day.
    #[serde(default)]
    pub auto_fetch_feeds: bool,
    /// UTC hour of the daily project fetch.
    #[serde(default)]
    pub auto_fetch_hour: u32,
    #[serde(default)]
    pub auto_fetch_minute: u32,
    /// Deployment targeted by auto-deploy.
    #[serde(default)]
    pub pinned_deployment_id: Option<ResourceId>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            name: name.into(),
            auto_deploy: false,
            auto_fetch_feeds: false,
            auto_fetch_hour: 0,
            auto_fetch_minute: 0,
            pinned_deployment_id: None,
        }
    }
}

/// Record of one deployment run against a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploySummary {
    /// Deployment-target (OTP server) identifier.
    pub server_id: String,
    pub deployed_at: DateTime<Utc>,
}

/// A deployable bundle of feed versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: ResourceId,
    pub project_id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub feed_version_ids: Vec<ResourceId>,
    /// Oldest first.
    #[serde(default)]
    pub deploy_summaries: Vec<DeploySummary>,
}

impl Deployment {
    pub fn new(project_id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            project_id,
            name: name.into(),
            feed_version_ids: Vec::new(),
            deploy_summaries: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&DeploySummary> {
        self.deploy_summaries.last()
    }
}
