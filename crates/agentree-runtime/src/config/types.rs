//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use agentree_types::TenantId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
///
/// Fields marked `#[serde(default)]` are optional in the config file.
///
/// # Example
///
/// ```
/// use agentree_runtime::config::AgentreeConfig;
///
/// let config = AgentreeConfig::default();
/// assert_eq!(config.default_tenant, "default");
/// assert_eq!(config.store.busy_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentreeConfig {
    /// Directory holding every tenant database file.
    pub data_dir: PathBuf,

    /// Tenant served by `StoreRegistry::get_default_store`.
    ///
    /// Its database also holds the tenant catalog.
    pub default_tenant: String,

    /// Tenant store settings.
    pub store: StoreConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for AgentreeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            default_tenant: "default".to_string(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AgentreeConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default config rooted at `data_dir`.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// The default tenant as a validated id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the configured name is not a
    /// usable tenant id.
    pub fn default_tenant_id(&self) -> Result<TenantId, ConfigError> {
        TenantId::try_from(self.default_tenant.as_str())
            .map_err(|e| ConfigError::invalid_value("default_tenant", e.to_string()))
    }

    /// Checks cross-field constraints after all layers are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_tenant_id()?;
        if self.store.default_db_file.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "store.default_db_file",
                "must not be empty",
            ));
        }
        if self.store.tenant_db_prefix.contains(['/', '\\']) {
            return Err(ConfigError::invalid_value(
                "store.tenant_db_prefix",
                "must not contain path separators",
            ));
        }
        Ok(())
    }
}

/// Tenant store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// File name of the default tenant's database (inside `data_dir`).
    pub default_db_file: String,

    /// File name prefix for every other tenant: `<prefix><tenant>.db`.
    pub tenant_db_prefix: String,

    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_db_file: "idc.db".to_string(),
            tenant_db_prefix: "idc_".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentreeConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.store.default_db_file, "idc.db");
        assert_eq!(config.store.tenant_db_prefix, "idc_");
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AgentreeConfig::from_toml(
            r#"
data_dir = "/srv/agents"

[store]
busy_timeout_ms = 250
"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/agents"));
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert_eq!(config.store.default_db_file, "idc.db");
        assert_eq!(config.default_tenant, "default");
    }

    #[test]
    fn validate_rejects_bad_tenant() {
        let config = AgentreeConfig {
            default_tenant: "../escape".into(),
            ..AgentreeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_tenant"));
    }

    #[test]
    fn validate_rejects_prefix_with_separator() {
        let mut config = AgentreeConfig::default();
        config.store.tenant_db_prefix = "sub/idc_".into();
        assert!(config.validate().is_err());
    }
}
