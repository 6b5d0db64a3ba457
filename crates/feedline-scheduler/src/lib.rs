//! Job orchestration for Feedline.
//!
//! Feed sources are fetched on per-source timers; every firing runs a
//! [`JobChain`] of fetch, validate and the optional auto-publish and
//! auto-deploy stages. The [`FeedUpdater`] independently polls object storage
//! for publish completions. [`FeedlineService`] owns both and is the hook the
//! configuration layer calls into.

pub mod chain;
pub mod context;
pub mod error;
pub mod job;
pub mod jobs;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod tracker;
pub mod updater;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::JobChain;
pub use context::{JobContext, PublisherProperty, Services};
pub use error::JobError;
pub use job::{JobWork, run_job};
pub use runner::JobRunner;
pub use scheduler::FeedScheduler;
pub use service::FeedlineService;
pub use tracker::JobTracker;
pub use updater::FeedUpdater;
