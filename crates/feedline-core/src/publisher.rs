//! External publisher trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::feed::FeedVersion;

/// Answer of the external publishing endpoint to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishOutcome {
    Accepted,
    Rejected { reason: String },
}

/// Sends feed versions to the external publishing pipeline.
///
/// Completion is not reported here: the pipeline drops a marker in object
/// storage once it is done, see [`crate::storage::CompletionStore`].
#[async_trait]
pub trait ExternalPublisher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit `version` on behalf of the agency `agency_id`. `actor` is
    /// recorded for attribution only.
    async fn submit(
        &self,
        agency_id: &str,
        version: &FeedVersion,
        actor: &str,
    ) -> Result<PublishOutcome>;
}
