//! KDL configuration parsing for Feedline.
//!
//! A single system file configures the collaborators the scheduler talks to
//! (fetcher, validator, publisher, deployment servers, completion storage)
//! and the completion poller.

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{
    DeployServerConfig, FetcherConfig, PublisherConfig, StorageConfig, SystemConfig,
    UpdaterConfig, ValidatorConfig, load_system_config, parse_system_config,
};
