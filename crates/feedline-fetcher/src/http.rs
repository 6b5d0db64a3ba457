//! HTTP feed fetcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedline_config::FetcherConfig;
use feedline_core::feed::FeedSource;
use feedline_core::fetcher::{FeedFetcher, FetchOutcome, FetchedFeed};
use feedline_core::{Error, Result};
use reqwest::StatusCode;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use tracing::{debug, info};

/// Downloads feeds from their source URL.
///
/// Sends `If-Modified-Since` when the source was fetched before, so servers
/// that honour it can answer `304 Not Modified`.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, source: &FeedSource) -> Result<FetchOutcome> {
        let url = source
            .url
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("feed source {} has no URL", source.id)))?;

        let mut request = self.client.get(url.clone());
        if let Some(last_fetched) = source.last_fetched {
            request = request.header(IF_MODIFIED_SINCE, http_date(last_fetched));
        }

        debug!(feed_source_id = %source.id, %url, "Fetching feed");
        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            info!(feed_source_id = %source.id, "Feed not modified");
            return Ok(FetchOutcome::NotModified);
        }
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned {}", url, status)));
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        let contents = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body from {}: {}", url, e)))?;
        if contents.is_empty() {
            return Err(Error::Fetch(format!("{} returned an empty body", url)));
        }

        info!(feed_source_id = %source.id, bytes = contents.len(), "Fetched feed");
        Ok(FetchOutcome::Fetched(FetchedFeed {
            contents,
            last_modified,
        }))
    }
}

/// IMF-fixdate, as used by HTTP date headers.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feedline_core::ResourceId;

    #[test]
    fn test_http_date_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 7, 5, 9).unwrap();
        assert_eq!(http_date(at), "Sun, 18 Oct 2026 07:05:09 GMT");
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Sun, 18 Oct 2026 07:05:09 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 10, 18, 7, 5, 9).unwrap());
        assert!(parse_http_date("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_source_without_url_is_rejected() {
        let fetcher = HttpFeedFetcher::new(&FetcherConfig::default()).unwrap();
        let source = FeedSource::new(ResourceId::new(), "No URL");

        let result = fetcher.fetch(&source).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
