//! CLI command implementations.

pub mod run;
pub mod serve;

use anyhow::{Context, Result};
use feedline_config::{SystemConfig, load_system_config};
use feedline_db::MemoryStore;
use feedline_deployer::{ExternalPublisher, HttpPublisher, OtpDeployTarget};
use feedline_fetcher::{HttpFeedFetcher, HttpValidator};
use feedline_scheduler::{FeedUpdater, FeedlineService, PublisherProperty, Services};
use feedline_storage::DirectoryCompletionStore;
use std::path::Path;
use std::sync::Arc;

pub fn validate(path: &Path) -> Result<()> {
    match load_system_config(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  deploy servers: {}", config.deploy_servers.len());
            println!(
                "  completion poller: {}",
                if config.updater.enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Store plus a service wired to the collaborators named in the config.
pub(crate) struct Runtime {
    pub store: Arc<MemoryStore>,
    pub service: FeedlineService,
}

pub(crate) async fn build_runtime(config_path: &Path, state_path: &Path) -> Result<Runtime> {
    let config = load_system_config(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;
    let store = Arc::new(
        MemoryStore::load(state_path)
            .await
            .with_context(|| format!("Failed to load state: {}", state_path.display()))?,
    );
    let service = build_service(&config, &store)?;
    Ok(Runtime { store, service })
}

fn build_service(config: &SystemConfig, store: &Arc<MemoryStore>) -> Result<FeedlineService> {
    let validator = config
        .validator
        .as_ref()
        .context("The config has no validator section")?;
    let publisher_property = config
        .publisher
        .as_ref()
        .map(|p| PublisherProperty {
            resource_type: p.resource_type.clone(),
            name: p.property.clone(),
        })
        .unwrap_or_default();
    let publisher: Option<Arc<dyn ExternalPublisher>> = match &config.publisher {
        Some(publisher) => Some(Arc::new(HttpPublisher::new(publisher)?)),
        None => None,
    };

    let repos = store.repos();
    let services = Arc::new(Services {
        repos: repos.clone(),
        fetcher: Arc::new(HttpFeedFetcher::new(&config.fetcher)?),
        validator: Arc::new(HttpValidator::new(validator)?),
        publisher,
        deploy_target: Arc::new(OtpDeployTarget::new(&config.deploy_servers)?),
        publisher_property: publisher_property.clone(),
    });

    let mut service = FeedlineService::new(services);
    if let Some(storage) = &config.storage {
        let updater = FeedUpdater::new(
            Arc::new(DirectoryCompletionStore::from_config(storage)),
            repos,
            publisher_property,
        );
        if config.updater.enabled {
            service = service.with_updater(Arc::new(updater), config.updater.interval);
        } else {
            // Still usable from check-published; only the timer is off.
            service = service.with_manual_updater(Arc::new(updater));
        }
    }
    Ok(service)
}
