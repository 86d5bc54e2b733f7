//! Configuration management for the request limiter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{LimiterError, Result};
use crate::ratelimit::classifier::{DEFAULT_DISCOUNTED_MODE, DEFAULT_MODE_KEY};
use crate::ratelimit::store::DEFAULT_CAPACITY;

/// Prefix of environment variables that override file configuration,
/// e.g. `REQUEST_LIMITER__LIMITER__REQUEST_LIMIT=20`.
pub const ENV_PREFIX: &str = "REQUEST_LIMITER";

/// Main configuration for the request limiter service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterServiceConfig {
    /// Limits and window
    #[serde(default)]
    pub limiter: RateLimiterConfig,

    /// Audit logging of denials
    #[serde(default)]
    pub audit: AuditConfig,

    /// Request cost classification
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Limits applied per client address.
///
/// A limit of zero or less disables that check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per period
    #[serde(default)]
    pub request_limit: i64,

    /// Maximum accumulated request size per period
    #[serde(default)]
    pub request_limit_in_bytes: i64,

    /// Length of the rolling window in seconds
    #[serde(default = "default_period")]
    pub request_limit_period_in_seconds: u64,

    /// Number of events kept in the shared history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl RateLimiterConfig {
    /// Create a configuration with the default history capacity.
    pub fn new(request_limit: i64, request_limit_in_bytes: i64, period_secs: u64) -> Self {
        Self {
            request_limit,
            request_limit_in_bytes,
            request_limit_period_in_seconds: period_secs,
            history_capacity: default_history_capacity(),
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(0, 0, default_period())
    }
}

fn default_period() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Output format of the audit sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditFormat {
    /// `warn` events through the tracing subscriber
    #[default]
    Tracing,
    /// One JSON object per line on stderr
    Json,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether denials are audited at all
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub format: AuditFormat,

    /// Identity used to tag entries; generated when unset
    #[serde(default)]
    pub server_id: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            format: AuditFormat::default(),
            server_id: None,
        }
    }
}

fn default_audit_enabled() -> bool {
    true
}

/// Which parameter marks a request as discounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_mode_key")]
    pub mode_key: String,

    #[serde(default = "default_discounted_mode")]
    pub discounted_mode: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode_key: default_mode_key(),
            discounted_mode: default_discounted_mode(),
        }
    }
}

fn default_mode_key() -> String {
    DEFAULT_MODE_KEY.to_string()
}

fn default_discounted_mode() -> String {
    DEFAULT_DISCOUNTED_MODE.to_string()
}

impl LimiterServiceConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LimiterServiceConfig = serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse limiter config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file, overridden by
    /// `REQUEST_LIMITER__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!(path = %path.display(), "Loading limiter configuration");
            let name = path.to_str().ok_or_else(|| {
                LimiterError::Config(format!("Non UTF-8 config path: {}", path.display()))
            })?;
            // YAML regardless of extension, matching `from_file`.
            builder = builder
                .add_source(config::File::new(name, config::FileFormat::Yaml).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: LimiterServiceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.limiter.history_capacity == 0 {
            return Err(LimiterError::Config(
                "history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.classifier.mode_key.is_empty() {
            return Err(LimiterError::Config(
                "classifier.mode_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LimiterServiceConfig::default();
        assert_eq!(config.limiter.request_limit, 0);
        assert_eq!(config.limiter.request_limit_in_bytes, 0);
        assert_eq!(config.limiter.request_limit_period_in_seconds, 60);
        assert_eq!(config.limiter.history_capacity, 1000);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.format, AuditFormat::Tracing);
        assert_eq!(config.classifier.mode_key, "mode");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
limiter:
  request_limit: 20
  request_limit_in_bytes: 50000
  request_limit_period_in_seconds: 300
audit:
  format: json
  server_id: node-7
classifier:
  discounted_mode: cheap
"#;
        let config = LimiterServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.request_limit, 20);
        assert_eq!(config.limiter.request_limit_in_bytes, 50000);
        assert_eq!(config.limiter.request_limit_period_in_seconds, 300);
        assert_eq!(config.limiter.history_capacity, 1000);
        assert_eq!(config.audit.format, AuditFormat::Json);
        assert_eq!(config.audit.server_id.as_deref(), Some("node-7"));
        assert_eq!(config.classifier.mode_key, "mode");
        assert_eq!(config.classifier.discounted_mode, "cheap");
    }

    #[test]
    fn test_parse_empty_yaml_uses_defaults() {
        let config = LimiterServiceConfig::from_yaml("{}").unwrap();
        assert_eq!(config.limiter, RateLimiterConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let yaml = r#"
limiter:
  history_capacity: 0
"#;
        let err = LimiterServiceConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, LimiterError::Config(_)));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let err = LimiterServiceConfig::from_yaml("limiter: [1, 2").unwrap_err();
        assert!(matches!(err, LimiterError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("request-limiter-{}.yaml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "limiter:\n  request_limit: 3").unwrap();

        let config = LimiterServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.limiter.request_limit, 3);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_env_overrides_file() {
        let path = std::env::temp_dir().join(format!("request-limiter-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "limiter:\n  request_limit: 3\n  request_limit_in_bytes: 900\n").unwrap();

        let env: HashMap<String, String> = [(
            "REQUEST_LIMITER__LIMITER__REQUEST_LIMIT".to_string(),
            "7".to_string(),
        )]
        .into_iter()
        .collect();

        let config = LimiterServiceConfig::load_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(config.limiter.request_limit, 7);
        assert_eq!(config.limiter.request_limit_in_bytes, 900);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_file_without_extension() {
        let path = std::env::temp_dir().join(format!("request-limiter-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "limiter:\n  request_limit: 4\n  request_limit_period_in_seconds: 15\n").unwrap();

        let loaded = LimiterServiceConfig::load_with_env(Some(&path), None).unwrap();
        let parsed = LimiterServiceConfig::from_file(&path).unwrap();
        assert_eq!(loaded.limiter, parsed.limiter);
        assert_eq!(loaded.limiter.request_limit, 4);
        assert_eq!(loaded.limiter.request_limit_period_in_seconds, 15);

        std::fs::remove_file(&path).unwrap();
    }
}
