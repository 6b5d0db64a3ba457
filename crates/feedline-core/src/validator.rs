//! Feed validator trait.
//!
//! The validation algorithm itself lives outside Feedline; jobs consume only
//! the severity counts it reports.

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;
use crate::feed::{FeedVersion, ValidationSummary};

#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn validate(&self, version: &FeedVersion, contents: &Bytes)
    -> Result<ValidationSummary>;
}
