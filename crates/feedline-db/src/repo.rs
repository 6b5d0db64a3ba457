//! Repository traits and their in-memory implementations.

pub mod deployment;
pub mod feed_source;
pub mod feed_version;
pub mod project;
pub mod property;

pub use deployment::DeploymentRepo;
pub use feed_source::FeedSourceRepo;
pub use feed_version::FeedVersionRepo;
pub use project::ProjectRepo;
pub use property::ExternalPropertyRepo;

use std::sync::Arc;

/// Repositories injected into jobs, the scheduler and the updater.
#[derive(Clone)]
pub struct Repos {
    pub projects: Arc<dyn ProjectRepo>,
    pub feed_sources: Arc<dyn FeedSourceRepo>,
    pub feed_versions: Arc<dyn FeedVersionRepo>,
    pub deployments: Arc<dyn DeploymentRepo>,
    pub properties: Arc<dyn ExternalPropertyRepo>,
}
