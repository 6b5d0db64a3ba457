//! Trip-planner (OTP) server deploy target.

use async_trait::async_trait;
use feedline_config::DeployServerConfig;
use feedline_core::ResourceId;
use feedline_core::deployer::{DeployOutcome, DeployTarget};
use feedline_core::project::Deployment;
use feedline_core::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Body posted to a server's deploy endpoint.
#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    deployment_id: ResourceId,
    name: &'a str,
    feed_version_ids: &'a [ResourceId],
}

/// Triggers deployments on the servers listed in the system config.
///
/// The server builds and loads the bundle on its own; a 2xx answer only
/// means the request was accepted.
pub struct OtpDeployTarget {
    client: reqwest::Client,
    servers: HashMap<String, Url>,
}

impl OtpDeployTarget {
    pub fn new(servers: &[DeployServerConfig]) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(TRIGGER_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            servers: servers
                .iter()
                .map(|s| (s.id.clone(), s.url.clone()))
                .collect(),
        })
    }

    pub fn knows_server(&self, server_id: &str) -> bool {
        self.servers.contains_key(server_id)
    }
}

#[async_trait]
impl DeployTarget for OtpDeployTarget {
    fn name(&self) -> &'static str {
        "otp"
    }

    async fn trigger(&self, server_id: &str, deployment: &Deployment) -> Result<DeployOutcome> {
        let Some(url) = self.servers.get(server_id) else {
            warn!(server_id, "Deployment server is not configured");
            return Ok(DeployOutcome::Rejected {
                reason: format!("Unknown deployment server '{}'", server_id),
            });
        };

        let body = TriggerRequest {
            deployment_id: deployment.id,
            name: &deployment.name,
            feed_version_ids: &deployment.feed_version_ids,
        };

        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Deployment(format!("Failed to reach {}: {}", server_id, e)))?;

        let status = response.status();
        if status.is_success() {
            info!(server_id, deployment_id = %deployment.id, "Deployment accepted");
            return Ok(DeployOutcome::Accepted);
        }

        let detail = response.text().await.unwrap_or_default();
        warn!(server_id, deployment_id = %deployment.id, %status, "Deployment rejected");
        Ok(DeployOutcome::Rejected {
            reason: if detail.is_empty() {
                format!("{} answered {}", server_id, status)
            } else {
                format!("{} answered {}: {}", server_id, status, detail.trim())
            },
        })
    }
}
