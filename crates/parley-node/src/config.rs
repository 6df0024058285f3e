//! Node configuration types.
//!
//! Values resolve in three layers: built-in defaults, then an optional YAML
//! file, then command-line flags (applied by the binary).

use crate::observability::LogFormat;
use parley_types::Role;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A customer registered at startup, typically a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeedCustomer {
    /// Fixed id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// Configuration for the Parley node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP listen address.
    pub api_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Lifetime of realtime capability grants, in seconds.
    pub grant_ttl_secs: u64,
    /// Page size used when a request omits `limit`.
    pub default_page_size: usize,
    /// Largest accepted `limit`.
    pub max_page_size: usize,
    /// Concurrent WebSocket connections.
    pub max_connections: usize,
    /// Customers registered at startup.
    pub seed: Vec<SeedCustomer>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            grant_ttl_secs: 3600,
            default_page_size: parley_types::DEFAULT_PAGE_SIZE,
            max_page_size: 100,
            max_connections: parley_realtime::DEFAULT_MAX_CONNECTIONS,
            seed: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Grant lifetime as a duration.
    pub fn grant_ttl(&self) -> Duration {
        Duration::from_secs(self.grant_ttl_secs)
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grant_ttl_secs == 0 {
            return Err(ConfigError::Invalid("grant_ttl_secs must be positive".into()));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::Invalid("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(
                "default_page_size exceeds max_page_size".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be positive".into()));
        }
        if let Some(seed) = self.seed.iter().find(|s| s.email.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "seed customer {:?} has no email",
                seed.name.as_deref().unwrap_or("<unnamed>")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grant_ttl(), Duration::from_secs(3600));
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = NodeConfig::from_yaml(
            r#"
api_addr: "0.0.0.0:9100"
log_format: json
seed:
  - name: Sam
    email: sam@shop.test
    role: ADMIN
"#,
        )
        .unwrap();

        assert_eq!(config.api_addr.port(), 9100);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.grant_ttl_secs, 3600);
        assert_eq!(config.seed.len(), 1);
        assert_eq!(config.seed[0].role, Role::Admin);
    }

    #[test]
    fn test_seed_role_defaults_to_customer() {
        let config = NodeConfig::from_yaml("seed:\n  - email: ann@shop.test\n").unwrap();
        assert_eq!(config.seed[0].role, Role::Customer);
        assert!(config.seed[0].id.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(matches!(
            NodeConfig::from_yaml("grant_ttl_secs: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            NodeConfig::from_yaml("default_page_size: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            NodeConfig::from_yaml("default_page_size: 200\nmax_page_size: 100"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            NodeConfig::from_yaml("api_addr: [nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_connections: 5").unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodeConfig::load(&dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
