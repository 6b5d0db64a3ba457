//! Client for an HTTP validation service.

use async_trait::async_trait;
use bytes::Bytes;
use feedline_config::ValidatorConfig;
use feedline_core::feed::{FeedVersion, ValidationSummary};
use feedline_core::validator::Validator;
use feedline_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;

/// Posts feed files to a validation service and reads back the severity
/// counts as JSON (`blocking_error_count`, `gtfs_plus_blocking_error_count`,
/// `high_severity_error_count`, `start_date`, `end_date`).
pub struct HttpValidator {
    client: reqwest::Client,
    url: Url,
}

impl HttpValidator {
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    fn request_url(&self, version: &FeedVersion) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("namespace", &version.namespace);
        url
    }
}

#[async_trait]
impl Validator for HttpValidator {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn validate(
        &self,
        version: &FeedVersion,
        contents: &Bytes,
    ) -> Result<ValidationSummary> {
        let url = self.request_url(version);
        debug!(feed_version_id = %version.id, %url, "Requesting validation");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/zip")
            .body(contents.clone())
            .send()
            .await
            .map_err(|e| Error::Validation(format!("Validator unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(feed_version_id = %version.id, %status, "Validator returned an error");
            return Err(Error::Validation(format!("Validator returned {}", status)));
        }

        response
            .json::<ValidationSummary>()
            .await
            .map_err(|e| Error::Validation(format!("Unreadable validation result: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedline_core::ResourceId;
    use feedline_core::feed::{FeedSource, RetrievalMethod};
    use std::time::Duration;

    #[test]
    fn test_request_url_carries_namespace() {
        let validator = HttpValidator::new(&ValidatorConfig {
            url: "http://validator.local/validate?strict=true".parse().unwrap(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let source = FeedSource::new(ResourceId::new(), "VTA");
        let version = FeedVersion::new(&source, 1, "h", 1, RetrievalMethod::Manual);

        let url = validator.request_url(&version);
        assert_eq!(
            url.as_str(),
            format!(
                "http://validator.local/validate?strict=true&namespace={}",
                version.namespace
            )
        );
    }
}
