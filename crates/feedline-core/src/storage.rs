//! Completion markers written by the external publisher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// An object listed from the publisher's output location.
///
/// The key encodes the agency id (`<prefix>/<agency>[.ext]`); the etag
/// changes whenever that agency's published output changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub key: String,
    pub etag: String,
}

impl CompletionMarker {
    pub fn new(key: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            etag: etag.into(),
        }
    }

    /// Agency id encoded in the key: the last path segment without its
    /// extension. `None` for directory-like keys.
    pub fn agency_id(&self) -> Option<&str> {
        let file = self.key.rsplit('/').next()?;
        let stem = match file.rfind('.') {
            Some(0) | None => file,
            Some(idx) => &file[..idx],
        };
        if stem.is_empty() { None } else { Some(stem) }
    }
}

/// Lists the completion markers currently in object storage.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with [`crate::Error::StorageUnavailable`] when the listing
    /// cannot be obtained.
    async fn list_completion_markers(&self) -> Result<Vec<CompletionMarker>>;
}
