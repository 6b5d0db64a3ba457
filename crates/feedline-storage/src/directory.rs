//! Completion markers read from a local (or mounted) directory.

use async_trait::async_trait;
use feedline_config::StorageConfig;
use feedline_core::storage::{CompletionMarker, CompletionStore};
use feedline_core::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// Lists the files directly under `<root>/<prefix>`.
///
/// Keys are `<prefix>/<file name>`; etags are the MD5 hex digest of the file
/// contents, matching what object stores report for single-part uploads.
pub struct DirectoryCompletionStore {
    root: PathBuf,
    prefix: String,
}

impl DirectoryCompletionStore {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone(), config.prefix.clone())
    }

    fn folder(&self) -> PathBuf {
        if self.prefix.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.prefix)
        }
    }

    fn key_for(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }
}

fn unavailable(context: &str, err: std::io::Error) -> Error {
    Error::StorageUnavailable(format!("{}: {}", context, err))
}

#[async_trait]
impl CompletionStore for DirectoryCompletionStore {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn list_completion_markers(&self) -> Result<Vec<CompletionMarker>> {
        let folder = self.folder();
        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            // Nothing has been published yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(&folder.display().to_string(), e)),
        };

        let mut markers = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&folder.display().to_string(), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| unavailable(&entry.path().display().to_string(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let contents = tokio::fs::read(entry.path())
                .await
                .map_err(|e| unavailable(&entry.path().display().to_string(), e))?;
            markers.push(CompletionMarker {
                key: self.key_for(&file_name),
                etag: hex::encode(md5::compute(&contents).0),
            });
        }

        markers.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(folder = %folder.display(), count = markers.len(), "Listed completion markers");
        Ok(markers)
    }
}
