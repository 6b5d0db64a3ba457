//! Deployment target trait.
//!
//! Deployment targets are trip-planner (OTP) servers. Feedline only triggers
//! a deployment and records whether the server accepted it; the build and
//! rollout happen on the server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::project::Deployment;

/// Answer of a deployment target to a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployOutcome {
    Accepted,
    Rejected { reason: String },
}

#[async_trait]
pub trait DeployTarget: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fire-and-forget deployment of `deployment` to `server_id`.
    async fn trigger(&self, server_id: &str, deployment: &Deployment) -> Result<DeployOutcome>;
}
