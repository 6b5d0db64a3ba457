//! Detects feed versions the external publisher has finished processing.

use chrono::Utc;
use feedline_core::storage::CompletionStore;
use feedline_db::{DbResult, Repos};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::PublisherProperty;

/// Polls the publisher's completion markers and stamps the matching feed
/// versions with `processed_by_external_publisher`.
///
/// Only etag changes count: each observed transition of a marker is
/// processed once, and versions published in between two polls are not told
/// apart.
pub struct FeedUpdater {
    store: Arc<dyn CompletionStore>,
    repos: Repos,
    property: PublisherProperty,
    /// Marker key -> last processed etag.
    etags: Mutex<HashMap<String, String>>,
}

impl FeedUpdater {
    pub fn new(store: Arc<dyn CompletionStore>, repos: Repos, property: PublisherProperty) -> Self {
        Self {
            store,
            repos,
            property,
            etags: Mutex::new(HashMap::new()),
        }
    }

    /// Poll once. Returns the markers (key -> etag) that changed since the
    /// previous poll.
    pub async fn tick(&self) -> HashMap<String, String> {
        // Held for the whole tick so two ticks never interleave.
        let mut etags = self.etags.lock().await;
        let mut detected = HashMap::new();

        let markers = match self.store.list_completion_markers().await {
            Ok(markers) => markers,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Could not list completion markers");
                return detected;
            }
        };

        for marker in markers {
            if etags.get(&marker.key) == Some(&marker.etag) {
                continue;
            }
            let Some(agency) = marker.agency_id() else {
                debug!(key = %marker.key, "Skipping marker without agency id");
                continue;
            };

            match self.mark_processed(agency).await {
                Ok(count) => {
                    info!(key = %marker.key, etag = %marker.etag, agency, versions = count, "Publish completion detected");
                    etags.insert(marker.key.clone(), marker.etag.clone());
                    detected.insert(marker.key, marker.etag);
                }
                Err(e) => {
                    warn!(key = %marker.key, agency, error = %e, "Could not record publish completion");
                }
            }
        }
        detected
    }

    /// Stamp every version of the agency's feed sources that was sent and
    /// not yet processed. The most recently sent version of each source
    /// becomes its published namespace.
    async fn mark_processed(&self, agency: &str) -> DbResult<usize> {
        let sources = self
            .repos
            .properties
            .feed_sources_with_property(&self.property.resource_type, &self.property.name, agency)
            .await?;
        if sources.is_empty() {
            return Ok(0);
        }

        let pending = self.repos.feed_versions.awaiting_publish(&sources).await?;
        let now = Utc::now();
        for version in &pending {
            let mut version = version.clone();
            version.processed_by_external_publisher = Some(now);
            self.repos.feed_versions.save_feed_version(&version).await?;
        }

        for feed_source_id in sources {
            // Sorted by sent time, oldest first.
            let Some(latest) = pending.iter().rfind(|v| v.feed_source_id == feed_source_id) else {
                continue;
            };
            if let Some(mut source) = self.repos.feed_sources.find_feed_source(feed_source_id).await? {
                source.published_namespace = Some(latest.namespace.clone());
                self.repos.feed_sources.save_feed_source(&source).await?;
            }
        }
        Ok(pending.len())
    }

    /// Poll every `period` until `token` is cancelled.
    pub async fn run(self: Arc<Self>, period: Duration, token: CancellationToken) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), store = self.store.name(), "Feed updater started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let detected = self.tick().await;
            if !detected.is_empty() {
                debug!(count = detected.len(), "Feed updater tick found completions");
            }
        }
        info!("Feed updater stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use chrono::Duration as ChronoDuration;
    use feedline_core::feed::{FeedSource, FeedVersion, RetrievalMethod};

    fn updater(harness: &Harness) -> FeedUpdater {
        FeedUpdater::new(
            harness.completions.clone(),
            harness.repos.clone(),
            PublisherProperty::default(),
        )
    }

    async fn sent_version(harness: &Harness, source: &FeedSource, n: u32, minutes_ago: i64) -> FeedVersion {
        let mut version = FeedVersion::new(source, n, format!("h{}", n), 1, RetrievalMethod::Automatic);
        version.sent_to_external_publisher = Some(Utc::now() - ChronoDuration::minutes(minutes_ago));
        harness.repos.feed_versions.save_feed_version(&version).await.unwrap();
        version
    }

    #[tokio::test]
    async fn test_completion_detected_exactly_once() {
        let harness = Harness::new().await;
        harness.set_agency("agencyA").await;
        let source = harness.source().await;
        let version = sent_version(&harness, &source, 1, 5).await;
        let updater = updater(&harness);

        assert!(updater.tick().await.is_empty());

        harness.completions.put("agencyA", "test-etag");
        let detected = updater.tick().await;
        assert_eq!(detected.len(), 1);
        assert!(detected.values().any(|etag| etag == "test-etag"));

        let stored = harness.repos.feed_versions.get_feed_version(version.id).await.unwrap();
        let processed_at = stored.processed_by_external_publisher.unwrap();

        assert!(updater.tick().await.is_empty());
        let again = harness.repos.feed_versions.get_feed_version(version.id).await.unwrap();
        assert_eq!(again.processed_by_external_publisher, Some(processed_at));
    }

    #[tokio::test]
    async fn test_new_etag_is_a_new_completion() {
        let harness = Harness::new().await;
        harness.set_agency("BA").await;
        let source = harness.source().await;
        let updater = updater(&harness);

        sent_version(&harness, &source, 1, 5).await;
        harness.completions.put("completed/BA.zip", "e1");
        assert_eq!(updater.tick().await.len(), 1);

        let second = sent_version(&harness, &source, 2, 1).await;
        harness.completions.put("completed/BA.zip", "e2");
        let detected = updater.tick().await;
        assert_eq!(detected.get("completed/BA.zip").map(String::as_str), Some("e2"));

        let stored = harness.repos.feed_versions.get_feed_version(second.id).await.unwrap();
        assert!(stored.processed_by_external_publisher.is_some());
    }

    #[tokio::test]
    async fn test_all_pending_versions_are_stamped() {
        let harness = Harness::new().await;
        harness.set_agency("BA").await;
        let source = harness.source().await;
        let older = sent_version(&harness, &source, 1, 30).await;
        let newer = sent_version(&harness, &source, 2, 10).await;
        let unsent = FeedVersion::new(&source, 3, "h3", 1, RetrievalMethod::Automatic);
        harness.repos.feed_versions.save_feed_version(&unsent).await.unwrap();

        harness.completions.put("BA", "e1");
        updater(&harness).tick().await;

        for id in [older.id, newer.id] {
            let stored = harness.repos.feed_versions.get_feed_version(id).await.unwrap();
            assert!(stored.processed_by_external_publisher.is_some());
        }
        let stored = harness.repos.feed_versions.get_feed_version(unsent.id).await.unwrap();
        assert!(stored.processed_by_external_publisher.is_none());
        assert_eq!(
            harness.source().await.published_namespace,
            Some(newer.namespace.clone())
        );
    }

    #[tokio::test]
    async fn test_storage_failure_changes_nothing() {
        let harness = Harness::new().await;
        harness.set_agency("BA").await;
        let source = harness.source().await;
        let version = sent_version(&harness, &source, 1, 5).await;
        let updater = updater(&harness);

        harness.completions.put("BA", "e1");
        harness.completions.set_unavailable(true);
        assert!(updater.tick().await.is_empty());
        let stored = harness.repos.feed_versions.get_feed_version(version.id).await.unwrap();
        assert!(stored.processed_by_external_publisher.is_none());

        harness.completions.set_unavailable(false);
        assert_eq!(updater.tick().await.len(), 1);
    }

    #[tokio::test]
    async fn test_marker_without_matching_versions_is_recorded() {
        let harness = Harness::new().await;
        let updater = updater(&harness);

        harness.completions.put("completed/XX.zip", "e1");
        assert_eq!(updater.tick().await.len(), 1);
        assert!(updater.tick().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_until_cancelled() {
        let harness = Harness::new().await;
        harness.set_agency("BA").await;
        let source = harness.source().await;
        let version = sent_version(&harness, &source, 1, 5).await;
        let updater = Arc::new(updater(&harness));
        let token = CancellationToken::new();
        let handle = tokio::spawn(updater.clone().run(Duration::from_secs(60), token.clone()));

        harness.completions.put("BA", "e1");
        tokio::time::sleep(Duration::from_secs(61)).await;
        let stored = harness.repos.feed_versions.get_feed_version(version.id).await.unwrap();
        assert!(stored.processed_by_external_publisher.is_some());

        token.cancel();
        handle.await.unwrap();
    }
}
