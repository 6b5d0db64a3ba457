//! Feed sources, feed versions and external publisher properties.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::ResourceId;

/// How new versions of a feed arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// Operators upload feed files by hand.
    #[default]
    Manual,
    /// The feed is fetched from `url` on a recurring timer.
    Automatic,
}

/// Unit for [`FeedSource::fetch_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchIntervalUnit {
    Minutes,
    Hours,
    #[default]
    Days,
}

impl FetchIntervalUnit {
    pub fn seconds(&self) -> u64 {
        match self {
            FetchIntervalUnit::Minutes => 60,
            FetchIntervalUnit::Hours => 60 * 60,
            FetchIntervalUnit::Days => 24 * 60 * 60,
        }
    }
}

/// One agency's feed and how it is ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: ResourceId,
    /// Owning project.
    pub project_id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub retrieval_method: RetrievalMethod,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval: u32,
    #[serde(default)]
    pub fetch_interval_unit: FetchIntervalUnit,
    /// Whether new versions may be pushed to the project's pinned deployment.
    #[serde(default)]
    pub deployable: bool,
    /// Whether new versions are sent to the external publisher.
    #[serde(default)]
    pub auto_publish: bool,
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default)]
    pub last_fetched: Option<DateTime<Utc>>,
    /// Namespace of the version the external publisher last finished.
    #[serde(default)]
    pub published_namespace: Option<String>,
}

fn default_fetch_interval() -> u32 {
    1
}

impl FeedSource {
    pub fn new(project_id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            project_id,
            name: name.into(),
            retrieval_method: RetrievalMethod::Manual,
            fetch_interval: default_fetch_interval(),
            fetch_interval_unit: FetchIntervalUnit::default(),
            deployable: false,
            auto_publish: false,
            url: None,
            last_fetched: None,
            published_namespace: None,
        }
    }

    /// Time between two automatic fetches, `None` if the interval is zero.
    pub fn fetch_period(&self) -> Option<Duration> {
        if self.fetch_interval == 0 {
            return None;
        }
        Some(Duration::from_secs(
            u64::from(self.fetch_interval) * self.fetch_interval_unit.seconds(),
        ))
    }

    /// A recurring fetch timer exists for this source iff this holds.
    pub fn is_auto_fetch_eligible(&self) -> bool {
        self.retrieval_method == RetrievalMethod::Automatic
            && self.url.is_some()
            && self.fetch_interval > 0
    }
}

/// Severity-classified error counts reported by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    #[serde(default)]
    pub blocking_error_count: u32,
    #[serde(default)]
    pub gtfs_plus_blocking_error_count: u32,
    #[serde(default)]
    pub high_severity_error_count: u32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ValidationSummary {
    pub fn has_critical_errors(&self) -> bool {
        self.blocking_error_count > 0 || self.high_severity_error_count > 0
    }

    /// Service ended before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end < today)
    }
}

/// One ingested snapshot of a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedVersion {
    pub id: ResourceId,
    pub feed_source_id: ResourceId,
    /// Sequence number within the feed source, starting at 1.
    pub version: u32,
    /// Opaque identifier of the loaded contents.
    pub namespace: String,
    /// MD5 hex digest of the feed file.
    pub hash: String,
    pub size: u64,
    pub retrieval_method: RetrievalMethod,
    pub retrieved_at: DateTime<Utc>,
    #[serde(default)]
    pub validation: Option<ValidationSummary>,
    #[serde(default)]
    pub sent_to_external_publisher: Option<DateTime<Utc>>,
    /// Who asked for the publish, for attribution only.
    #[serde(default)]
    pub sent_by: Option<String>,
    #[serde(default)]
    pub processed_by_external_publisher: Option<DateTime<Utc>>,
}

impl FeedVersion {
    pub fn new(
        source: &FeedSource,
        version: u32,
        hash: impl Into<String>,
        size: u64,
        retrieval_method: RetrievalMethod,
    ) -> Self {
        Self {
            id: ResourceId::new(),
            feed_source_id: source.id,
            version,
            namespace: uuid::Uuid::new_v4().simple().to_string(),
            hash: hash.into(),
            size,
            retrieval_method,
            retrieved_at: Utc::now(),
            validation: None,
            sent_to_external_publisher: None,
            sent_by: None,
            processed_by_external_publisher: None,
        }
    }

    /// Sent to the external publisher, completion not yet observed.
    pub fn is_awaiting_publish(&self) -> bool {
        self.sent_to_external_publisher.is_some() && self.processed_by_external_publisher.is_none()
    }
}

/// Key/value attached to a feed source for an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPublisherProperty {
    pub id: ResourceId,
    pub feed_source_id: ResourceId,
    /// External system the property belongs to, e.g. `MTC`.
    pub resource_type: String,
    /// Property name, e.g. `AgencyId`.
    pub name: String,
    pub value: String,
}

impl ExternalPublisherProperty {
    pub fn new(
        feed_source_id: ResourceId,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: ResourceId::new(),
            feed_source_id,
            resource_type: resource_type.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}
