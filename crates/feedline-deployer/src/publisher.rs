//! HTTP client for the external publishing pipeline.

use async_trait::async_trait;
use feedline_config::PublisherConfig;
use feedline_core::ResourceId;
use feedline_core::feed::FeedVersion;
use feedline_core::publisher::{ExternalPublisher, PublishOutcome};
use feedline_core::{Error, Result};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    agency_id: &'a str,
    feed_version_id: ResourceId,
    namespace: &'a str,
    hash: &'a str,
    submitted_by: &'a str,
}

/// Submits feed versions to the publisher endpoint.
///
/// 4xx answers are rejections; 5xx answers and network failures are errors
/// so the next scheduled run retries.
pub struct HttpPublisher {
    client: reqwest::Client,
    url: Url,
}

impl HttpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl ExternalPublisher for HttpPublisher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit(
        &self,
        agency_id: &str,
        version: &FeedVersion,
        actor: &str,
    ) -> Result<PublishOutcome> {
        let body = SubmitRequest {
            agency_id,
            feed_version_id: version.id,
            namespace: &version.namespace,
            hash: &version.hash,
            submitted_by: actor,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Publish(format!("Publisher unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(agency_id, feed_version_id = %version.id, "Feed version submitted");
            Ok(PublishOutcome::Accepted)
        } else if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            warn!(agency_id, feed_version_id = %version.id, %status, "Publisher rejected feed version");
            Ok(PublishOutcome::Rejected {
                reason: format!("{} {}", status, detail.trim()).trim().to_string(),
            })
        } else {
            Err(Error::Publish(format!("Publisher returned {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_body() {
        let feed_version_id = ResourceId::new();
        let body = SubmitRequest {
            agency_id: "BA",
            feed_version_id,
            namespace: "abc123",
            hash: "d41d8cd98f00b204e9800998ecf8427e",
            submitted_by: "scheduler",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["agency_id"], "BA");
        assert_eq!(json["feed_version_id"], feed_version_id.to_string());
        assert_eq!(json["submitted_by"], "scheduler");
    }
}
