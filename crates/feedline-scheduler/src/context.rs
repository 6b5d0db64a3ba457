//! Collaborators and per-chain state handed to jobs.

use bytes::Bytes;
use feedline_core::ResourceId;
use feedline_core::deployer::DeployTarget;
use feedline_core::feed::{FeedSource, FeedVersion};
use feedline_core::fetcher::FeedFetcher;
use feedline_core::project::Project;
use feedline_core::publisher::ExternalPublisher;
use feedline_core::validator::Validator;
use feedline_db::Repos;
use std::sync::Arc;

use crate::error::JobError;

/// External publisher property that carries a feed source's agency id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherProperty {
    pub resource_type: String,
    pub name: String,
}

impl Default for PublisherProperty {
    fn default() -> Self {
        Self {
            resource_type: "MTC".to_string(),
            name: "AgencyId".to_string(),
        }
    }
}

/// Everything a job may talk to.
pub struct Services {
    pub repos: Repos,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub validator: Arc<dyn Validator>,
    /// `None` when no publisher is configured; auto-publish then fails.
    pub publisher: Option<Arc<dyn ExternalPublisher>>,
    pub deploy_target: Arc<dyn DeployTarget>,
    pub publisher_property: PublisherProperty,
}

/// State threaded through the stages of one chain.
///
/// Guards read it to decide whether the next stage is built; jobs update it
/// (a fetch fills in `new_version` and `contents`).
pub struct JobContext {
    pub services: Arc<Services>,
    pub feed_source: FeedSource,
    pub project: Option<Project>,
    /// Version created by this chain, if any.
    pub new_version: Option<FeedVersion>,
    pub contents: Option<Bytes>,
    /// Who started the chain, recorded for attribution.
    pub actor: String,
}

impl JobContext {
    pub fn new(services: Arc<Services>, feed_source: FeedSource, actor: impl Into<String>) -> Self {
        Self {
            services,
            feed_source,
            project: None,
            new_version: None,
            contents: None,
            actor: actor.into(),
        }
    }

    /// Build a context from the current stored feed source and its project.
    pub async fn load(
        services: Arc<Services>,
        feed_source_id: ResourceId,
        actor: impl Into<String>,
    ) -> Result<Self, JobError> {
        Self::find(services, feed_source_id, actor)
            .await?
            .ok_or_else(|| {
                JobError::Configuration(format!("Feed source {} does not exist.", feed_source_id))
            })
    }

    /// Like [`JobContext::load`], but a deleted feed source is `None`.
    pub async fn find(
        services: Arc<Services>,
        feed_source_id: ResourceId,
        actor: impl Into<String>,
    ) -> Result<Option<Self>, JobError> {
        let Some(feed_source) = services
            .repos
            .feed_sources
            .find_feed_source(feed_source_id)
            .await?
        else {
            return Ok(None);
        };
        let project = services
            .repos
            .projects
            .find_project(feed_source.project_id)
            .await?;

        let mut ctx = Self::new(services, feed_source, actor);
        ctx.project = project;
        Ok(Some(ctx))
    }

    pub fn repos(&self) -> &Repos {
        &self.services.repos
    }

    /// Version this chain works on: the one it created, otherwise the
    /// latest stored version of the feed source.
    pub async fn current_version(&self) -> Result<Option<FeedVersion>, JobError> {
        if let Some(version) = &self.new_version {
            return Ok(Some(version.clone()));
        }
        Ok(self
            .repos()
            .feed_versions
            .latest_feed_version(self.feed_source.id)
            .await?)
    }
}
