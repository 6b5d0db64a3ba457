//! Mock collaborators and a seeded store for the scheduler tests.

use async_trait::async_trait;
use bytes::Bytes;
use feedline_core::deployer::{DeployOutcome, DeployTarget};
use feedline_core::feed::{
    ExternalPublisherProperty, FeedSource, FeedVersion, RetrievalMethod, ValidationSummary,
};
use feedline_core::fetcher::{FeedFetcher, FetchOutcome, FetchedFeed};
use feedline_core::project::{DeploySummary, Deployment, Project};
use feedline_core::publisher::{ExternalPublisher, PublishOutcome};
use feedline_core::storage::{CompletionMarker, CompletionStore};
use feedline_core::validator::Validator;
use feedline_core::{Error, ResourceId, Result};
use feedline_db::{MemoryStore, Repos};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::{JobContext, PublisherProperty, Services};
use crate::jobs::create_version;

enum FetchBehaviour {
    Serve(Bytes),
    NotModified,
    Fail(String),
}

pub struct StaticFetcher {
    behaviour: Mutex<FetchBehaviour>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    fn new() -> Self {
        Self {
            behaviour: Mutex::new(FetchBehaviour::Serve(Bytes::from_static(b"initial"))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn serve(&self, contents: &'static [u8]) {
        *self.behaviour.lock().unwrap() = FetchBehaviour::Serve(Bytes::from_static(contents));
    }

    pub fn not_modified(&self) {
        *self.behaviour.lock().unwrap() = FetchBehaviour::NotModified;
    }

    pub fn fail(&self, message: &str) {
        *self.behaviour.lock().unwrap() = FetchBehaviour::Fail(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, _source: &FeedSource) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.behaviour.lock().unwrap() {
            FetchBehaviour::Serve(contents) => Ok(FetchOutcome::Fetched(FetchedFeed {
                contents: contents.clone(),
                last_modified: None,
            })),
            FetchBehaviour::NotModified => Ok(FetchOutcome::NotModified),
            FetchBehaviour::Fail(message) => Err(Error::Fetch(message.clone())),
        }
    }
}

pub struct StaticValidator {
    result: Mutex<std::result::Result<ValidationSummary, String>>,
}

impl StaticValidator {
    pub fn respond(&self, summary: ValidationSummary) {
        *self.result.lock().unwrap() = Ok(summary);
    }

    pub fn fail(&self, message: &str) {
        *self.result.lock().unwrap() = Err(message.to_string());
    }
}

#[async_trait]
impl Validator for StaticValidator {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn validate(&self, _version: &FeedVersion, _contents: &Bytes) -> Result<ValidationSummary> {
        self.result
            .lock()
            .unwrap()
            .clone()
            .map_err(Error::Validation)
    }
}

#[derive(Default)]
pub struct MockPublisher {
    agencies: Mutex<Vec<String>>,
    rejection: Mutex<Option<String>>,
}

impl MockPublisher {
    pub fn reject(&self, reason: &str) {
        *self.rejection.lock().unwrap() = Some(reason.to_string());
    }

    pub fn submissions(&self) -> usize {
        self.agencies.lock().unwrap().len()
    }

    pub fn last_agency(&self) -> Option<String> {
        self.agencies.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ExternalPublisher for MockPublisher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn submit(&self, agency_id: &str, _version: &FeedVersion, _actor: &str) -> Result<PublishOutcome> {
        if let Some(reason) = self.rejection.lock().unwrap().clone() {
            return Ok(PublishOutcome::Rejected { reason });
        }
        self.agencies.lock().unwrap().push(agency_id.to_string());
        Ok(PublishOutcome::Accepted)
    }
}

#[derive(Default)]
pub struct MockDeployTarget {
    servers: Mutex<Vec<String>>,
    rejection: Mutex<Option<String>>,
}

impl MockDeployTarget {
    pub fn reject(&self, reason: &str) {
        *self.rejection.lock().unwrap() = Some(reason.to_string());
    }

    pub fn triggers(&self) -> usize {
        self.servers.lock().unwrap().len()
    }

    pub fn last_server(&self) -> Option<String> {
        self.servers.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DeployTarget for MockDeployTarget {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn trigger(&self, server_id: &str, _deployment: &Deployment) -> Result<DeployOutcome> {
        if let Some(reason) = self.rejection.lock().unwrap().clone() {
            return Ok(DeployOutcome::Rejected { reason });
        }
        self.servers.lock().unwrap().push(server_id.to_string());
        Ok(DeployOutcome::Accepted)
    }
}

#[derive(Default)]
pub struct MockCompletionStore {
    markers: Mutex<Vec<CompletionMarker>>,
    unavailable: Mutex<bool>,
}

impl MockCompletionStore {
    pub fn put(&self, key: &str, etag: &str) {
        let mut markers = self.markers.lock().unwrap();
        markers.retain(|m| m.key != key);
        markers.push(CompletionMarker::new(key, etag));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl CompletionStore for MockCompletionStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_completion_markers(&self) -> Result<Vec<CompletionMarker>> {
        if *self.unavailable.lock().unwrap() {
            return Err(Error::StorageUnavailable("bucket unreachable".to_string()));
        }
        Ok(self.markers.lock().unwrap().clone())
    }
}

/// A project with one automatic feed source, wired to mock collaborators.
pub struct Harness {
    pub repos: Repos,
    pub services: Arc<Services>,
    pub fetcher: Arc<StaticFetcher>,
    pub validator: Arc<StaticValidator>,
    pub publisher: Arc<MockPublisher>,
    pub deploy_target: Arc<MockDeployTarget>,
    pub completions: Arc<MockCompletionStore>,
    pub project_id: ResourceId,
    pub feed_source_id: ResourceId,
    uploads: AtomicUsize,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let repos = store.repos();

        let project = Project::new("Bay Area");
        let mut source = FeedSource::new(project.id, "Caltrain");
        source.retrieval_method = RetrievalMethod::Automatic;
        source.url = Some("http://example.com/caltrain.zip".parse().unwrap());
        repos.projects.save_project(&project).await.unwrap();
        repos.feed_sources.save_feed_source(&source).await.unwrap();

        let fetcher = Arc::new(StaticFetcher::new());
        let validator = Arc::new(StaticValidator {
            result: Mutex::new(Ok(ValidationSummary::default())),
        });
        let publisher = Arc::new(MockPublisher::default());
        let deploy_target = Arc::new(MockDeployTarget::default());
        let services = Arc::new(Services {
            repos: repos.clone(),
            fetcher: fetcher.clone(),
            validator: validator.clone(),
            publisher: Some(publisher.clone()),
            deploy_target: deploy_target.clone(),
            publisher_property: PublisherProperty::default(),
        });

        Self {
            repos,
            services,
            fetcher,
            validator,
            publisher,
            deploy_target,
            completions: Arc::new(MockCompletionStore::default()),
            project_id: project.id,
            feed_source_id: source.id,
            uploads: AtomicUsize::new(0),
        }
    }

    pub async fn context(&self) -> JobContext {
        JobContext::load(self.services.clone(), self.feed_source_id, "test")
            .await
            .unwrap()
    }

    pub async fn source(&self) -> FeedSource {
        self.repos
            .feed_sources
            .get_feed_source(self.feed_source_id)
            .await
            .unwrap()
    }

    pub async fn update_source(&self, change: impl FnOnce(&mut FeedSource)) -> FeedSource {
        let mut source = self.source().await;
        change(&mut source);
        self.repos.feed_sources.save_feed_source(&source).await.unwrap();
        source
    }

    pub async fn update_project(&self, change: impl FnOnce(&mut Project)) -> Project {
        let mut project = self.repos.projects.get_project(self.project_id).await.unwrap();
        change(&mut project);
        self.repos.projects.save_project(&project).await.unwrap();
        project
    }

    /// Context holding a freshly stored, unvalidated version.
    pub async fn context_with_new_version(&self, contents: &'static [u8]) -> JobContext {
        let mut ctx = self.context().await;
        create_version(&mut ctx, Bytes::from_static(contents), RetrievalMethod::Manual)
            .await
            .unwrap()
            .unwrap();
        ctx
    }

    /// Context holding a freshly stored version with `summary` attached.
    pub async fn context_with_validated_version(&self, summary: ValidationSummary) -> JobContext {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let mut ctx = self.context().await;
        let mut version = create_version(
            &mut ctx,
            Bytes::from(format!("upload-{}", n)),
            RetrievalMethod::Manual,
        )
        .await
        .unwrap()
        .unwrap();
        version.validation = Some(summary);
        self.repos.feed_versions.save_feed_version(&version).await.unwrap();
        ctx.new_version = Some(version);
        ctx
    }

    pub async fn set_agency(&self, agency: &str) {
        self.set_agency_for(self.feed_source_id, agency).await;
    }

    pub async fn set_agency_for(&self, feed_source_id: ResourceId, agency: &str) {
        let property = ExternalPublisherProperty::new(feed_source_id, "MTC", "AgencyId", agency);
        self.repos.properties.save_property(&property).await.unwrap();
    }

    /// Mark the feed source deployable and the project auto-deploying to
    /// `pinned`.
    pub async fn enable_auto_deploy(&self, pinned: Option<ResourceId>) {
        self.update_source(|s| s.deployable = true).await;
        self.update_project(|p| {
            p.auto_deploy = true;
            p.pinned_deployment_id = pinned;
        })
        .await;
    }

    /// Create a deployment already deployed to `servers` (oldest first) and
    /// pin it with auto-deploy enabled.
    pub async fn pin_deployment(&self, servers: &[&str]) -> ResourceId {
        let mut deployment = Deployment::new(self.project_id, "regional");
        for server in servers {
            deployment.deploy_summaries.push(DeploySummary {
                server_id: server.to_string(),
                deployed_at: chrono::Utc::now(),
            });
        }
        self.repos.deployments.save_deployment(&deployment).await.unwrap();
        self.enable_auto_deploy(Some(deployment.id)).await;
        deployment.id
    }
}
