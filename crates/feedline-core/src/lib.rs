//! Core domain types and traits for the Feedline transit-feed manager.
//!
//! This crate contains:
//! - Resource identifiers and the shared error type
//! - Feed sources, feed versions and publisher properties
//! - Projects and deployments
//! - Job status types observed by operators
//! - Collaborator traits (fetcher, validator, publisher, deploy target,
//!   completion store)

pub mod deployer;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod id;
pub mod job;
pub mod project;
pub mod publisher;
pub mod storage;
pub mod validator;

pub use error::{Error, Result};
pub use id::ResourceId;
