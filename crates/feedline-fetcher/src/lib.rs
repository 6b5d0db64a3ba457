//! Feed download and validation clients for Feedline.
//!
//! Provides HTTP implementations of the collaborator traits used by the
//! fetch and validate jobs:
//! - [`HttpFeedFetcher`] downloads feeds with conditional GETs
//! - [`HttpValidator`] posts feed files to a validation service

pub mod http;
pub mod validator;

pub use feedline_core::fetcher::{FeedFetcher, FetchOutcome, FetchedFeed};
pub use feedline_core::validator::Validator;
pub use http::HttpFeedFetcher;
pub use validator::HttpValidator;
