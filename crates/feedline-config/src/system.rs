//! System configuration parsing.
//!
//! ```kdl
//! updater interval-seconds=60 enabled=#true
//! storage root="/var/lib/feedline/published" prefix="completed"
//! validator url="http://localhost:8080/validate" timeout-seconds=120
//! publisher url="https://publisher.example.com/feeds" resource-type="MTC" property="AgencyId"
//! fetcher timeout-seconds=60 user-agent="feedline"
//! deploy-server "otp-prod" url="http://otp.example.com/deploy"
//! ```

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// System-wide configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub updater: UpdaterConfig,
    pub storage: Option<StorageConfig>,
    pub validator: Option<ValidatorConfig>,
    pub publisher: Option<PublisherConfig>,
    pub fetcher: FetcherConfig,
    pub deploy_servers: Vec<DeployServerConfig>,
}

/// Completion poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(60),
        }
    }
}

/// Where the external publisher drops its completion markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub url: Url,
    /// External system of the agency property, e.g. `MTC`.
    pub resource_type: String,
    /// Name of the agency property, e.g. `AgencyId`.
    pub property: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: concat!("feedline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A trip-planner server that accepts deployment triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployServerConfig {
    pub id: String,
    pub url: Url,
}

const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(120);

/// Read and parse a system configuration file.
pub fn load_system_config(path: impl AsRef<Path>) -> ConfigResult<SystemConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_system_config(&content)
}

/// Parse system configuration from KDL text.
pub fn parse_system_config(kdl: &str) -> ConfigResult<SystemConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = SystemConfig::default();
    let mut server_ids = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "updater" => config.updater = parse_updater(node)?,
            "storage" => config.storage = Some(parse_storage(node)?),
            "validator" => {
                config.validator = Some(ValidatorConfig {
                    url: get_url_prop(node, "validator url")?,
                    timeout: get_seconds_prop(node, "timeout-seconds")?
                        .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT),
                });
            }
            "publisher" => config.publisher = Some(parse_publisher(node)?),
            "fetcher" => {
                let defaults = FetcherConfig::default();
                config.fetcher = FetcherConfig {
                    timeout: get_seconds_prop(node, "timeout-seconds")?
                        .unwrap_or(defaults.timeout),
                    user_agent: get_string_prop(node, "user-agent")
                        .unwrap_or(defaults.user_agent),
                };
            }
            "deploy-server" => {
                let server = parse_deploy_server(node)?;
                if !server_ids.insert(server.id.clone()) {
                    return Err(ConfigError::Duplicate(format!(
                        "deploy-server '{}'",
                        server.id
                    )));
                }
                config.deploy_servers.push(server);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if config.updater.enabled && config.storage.is_none() {
        return Err(ConfigError::MissingField(
            "storage (required when the updater is enabled)".to_string(),
        ));
    }

    Ok(config)
}

fn parse_updater(node: &KdlNode) -> ConfigResult<UpdaterConfig> {
    let defaults = UpdaterConfig::default();
    let interval = get_seconds_prop(node, "interval-seconds")?.unwrap_or(defaults.interval);
    if interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "updater interval-seconds".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(UpdaterConfig {
        // Declaring the node turns the updater on unless told otherwise.
        enabled: get_bool_prop(node, "enabled").unwrap_or(true),
        interval,
    })
}

fn parse_storage(node: &KdlNode) -> ConfigResult<StorageConfig> {
    let root = get_string_prop(node, "root")
        .ok_or_else(|| ConfigError::MissingField("storage root".to_string()))?;
    let prefix = get_string_prop(node, "prefix").unwrap_or_default();
    Ok(StorageConfig {
        root: PathBuf::from(root),
        prefix: prefix.trim_matches('/').to_string(),
    })
}

fn parse_publisher(node: &KdlNode) -> ConfigResult<PublisherConfig> {
    Ok(PublisherConfig {
        url: get_url_prop(node, "publisher url")?,
        resource_type: get_string_prop(node, "resource-type")
            .ok_or_else(|| ConfigError::MissingField("publisher resource-type".to_string()))?,
        property: get_string_prop(node, "property")
            .ok_or_else(|| ConfigError::MissingField("publisher property".to_string()))?,
        timeout: get_seconds_prop(node, "timeout-seconds")?
            .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT),
    })
}

fn parse_deploy_server(node: &KdlNode) -> ConfigResult<DeployServerConfig> {
    let id = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("deploy-server id".to_string()))?;
    let url = get_url_prop(node, &format!("deploy-server '{}' url", id))?;
    Ok(DeployServerConfig { id, url })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

fn get_url_prop(node: &KdlNode, field: &str) -> ConfigResult<Url> {
    let raw = get_string_prop(node, "url")
        .ok_or_else(|| ConfigError::MissingField(field.to_string()))?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn get_seconds_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<Duration>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    let seconds = value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: format!("{} {}", node.name().value(), name),
            message: format!("expected a non-negative integer, got {:?}", value),
        })?;
    Ok(Some(Duration::from_secs(seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let kdl = r#"
            updater interval-seconds=30
            storage root="/var/lib/feedline/published" prefix="/completed/"
            validator url="http://localhost:8080/validate" timeout-seconds=90
            publisher url="https://publisher.example.com/feeds" resource-type="MTC" property="AgencyId"
            fetcher timeout-seconds=15 user-agent="feedline-test"
            deploy-server "otp-staging" url="http://staging.example.com/deploy"
            deploy-server "otp-prod" url="http://prod.example.com/deploy"
        "#;

        let config = parse_system_config(kdl).unwrap();
        assert!(config.updater.enabled);
        assert_eq!(config.updater.interval, Duration::from_secs(30));

        let storage = config.storage.unwrap();
        assert_eq!(storage.root, PathBuf::from("/var/lib/feedline/published"));
        assert_eq!(storage.prefix, "completed");

        let validator = config.validator.unwrap();
        assert_eq!(validator.timeout, Duration::from_secs(90));

        let publisher = config.publisher.unwrap();
        assert_eq!(publisher.resource_type, "MTC");
        assert_eq!(publisher.property, "AgencyId");
        assert_eq!(publisher.timeout, DEFAULT_COLLABORATOR_TIMEOUT);

        assert_eq!(config.fetcher.user_agent, "feedline-test");
        assert_eq!(config.deploy_servers.len(), 2);
        assert_eq!(config.deploy_servers[1].id, "otp-prod");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_system_config("").unwrap();
        assert!(!config.updater.enabled);
        assert!(config.storage.is_none());
        assert!(config.publisher.is_none());
        assert_eq!(config.fetcher.timeout, Duration::from_secs(60));
        assert!(config.deploy_servers.is_empty());
    }

    #[test]
    fn test_updater_requires_storage() {
        let result = parse_system_config("updater interval-seconds=60");
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_disabled_updater_does_not_need_storage() {
        let config = parse_system_config("updater enabled=#false").unwrap();
        assert!(!config.updater.enabled);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let kdl = r#"
            updater interval-seconds=0
            storage root="/tmp"
        "#;
        assert!(matches!(
            parse_system_config(kdl),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_deploy_server() {
        let kdl = r#"
            deploy-server "otp" url="http://a.example.com"
            deploy-server "otp" url="http://b.example.com"
        "#;
        assert!(matches!(
            parse_system_config(kdl),
            Err(ConfigError::Duplicate(_))
        ));
    }

    #[test]
    fn test_invalid_url() {
        let kdl = r#"validator url="not a url""#;
        assert!(matches!(
            parse_system_config(kdl),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_publisher_requires_property() {
        let kdl = r#"publisher url="https://publisher.example.com" resource-type="MTC""#;
        assert!(matches!(
            parse_system_config(kdl),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedline.kdl");
        std::fs::write(&path, r#"fetcher timeout-seconds=5"#).unwrap();

        let config = load_system_config(&path).unwrap();
        assert_eq!(config.fetcher.timeout, Duration::from_secs(5));

        assert!(matches!(
            load_system_config(dir.path().join("missing.kdl")),
            Err(ConfigError::Io(_))
        ));
    }
}
