//! Deployment and publishing backends for Feedline.
//!
//! Provides:
//! - [`OtpDeployTarget`], which triggers deployments on trip-planner servers
//! - [`HttpPublisher`], which submits feed versions to the external publisher

pub mod otp;
pub mod publisher;

pub use feedline_core::deployer::{DeployOutcome, DeployTarget};
pub use feedline_core::publisher::{ExternalPublisher, PublishOutcome};
pub use otp::OtpDeployTarget;
pub use publisher::HttpPublisher;
