//! Configuration loader.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file (`--config` path, if it exists)
//! 3. Environment variables (`AGENTREE_*`)
//!
//! Each layer overrides the previous.

use super::{AgentreeConfig, ConfigError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding [`AgentreeConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "AGENTREE_DATA_DIR";
/// Environment variable overriding [`AgentreeConfig::default_tenant`].
pub const ENV_DEFAULT_TENANT: &str = "AGENTREE_DEFAULT_TENANT";
/// Environment variable overriding `store.busy_timeout_ms`.
pub const ENV_BUSY_TIMEOUT_MS: &str = "AGENTREE_BUSY_TIMEOUT_MS";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "AGENTREE_LOG_LEVEL";

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use agentree_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_config_file("/etc/agentree/config.toml")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), agentree_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Config file path. `None` skips the file layer.
    config_path: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the config file path.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads, layers and validates configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file exists but cannot be
    /// parsed, an environment override is malformed, or the result fails
    /// validation. A missing config file is silently ignored.
    pub fn load(&self) -> Result<AgentreeConfig, ConfigError> {
        let mut config = match self.config_path {
            Some(ref path) => match Self::load_file(path)? {
                Some(file_config) => {
                    debug!(path = %path.display(), "Loaded config file");
                    file_config
                }
                None => {
                    debug!(path = %path.display(), "Config file not found, using defaults");
                    AgentreeConfig::default()
                }
            },
            None => AgentreeConfig::default(),
        };

        if !self.skip_env {
            Self::apply_env_vars(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(path: &Path) -> Result<Option<AgentreeConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let config =
            AgentreeConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(config))
    }

    /// Applies environment variable overrides.
    fn apply_env_vars(config: &mut AgentreeConfig) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(ENV_DEFAULT_TENANT) {
            config.default_tenant = val;
        }

        if let Ok(val) = std::env::var(ENV_BUSY_TIMEOUT_MS) {
            config.store.busy_timeout_ms = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(ENV_BUSY_TIMEOUT_MS, "expected integer"))?;
        }

        if let Ok(val) = std::env::var(ENV_LOG_LEVEL) {
            config.logging.level = val;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new().skip_env_vars().load().unwrap();
        assert_eq!(config, AgentreeConfig::default());
    }

    #[test]
    fn load_config_file() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(
            temp.path(),
            r#"
default_tenant = "main"

[store]
tenant_db_prefix = "t_"

[logging]
level = "debug"
"#,
        );

        let config = ConfigLoader::new()
            .with_config_file(&path)
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.default_tenant, "main");
        assert_eq!(config.store.tenant_db_prefix, "t_");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn missing_config_file_ok() {
        let config = ConfigLoader::new()
            .with_config_file("/nonexistent/path/config.toml")
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, AgentreeConfig::default());
    }

    #[test]
    fn malformed_config_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "data_dir = [");

        let err = ConfigLoader::new()
            .with_config_file(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn invalid_file_value_fails_validation() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), r#"default_tenant = """#);

        let err = ConfigLoader::new()
            .with_config_file(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn env_var_override() {
        // The only test in this crate that touches AGENTREE_* variables.
        std::env::set_var(ENV_DATA_DIR, "/tmp/agentree-env");
        std::env::set_var(ENV_LOG_LEVEL, "info");
        std::env::set_var(ENV_BUSY_TIMEOUT_MS, "not-a-number");

        let err = ConfigLoader::new().load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));

        std::env::set_var(ENV_BUSY_TIMEOUT_MS, "100");
        let config = ConfigLoader::new().load().unwrap();

        std::env::remove_var(ENV_DATA_DIR);
        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_BUSY_TIMEOUT_MS);

        assert_eq!(config.data_dir, PathBuf::from("/tmp/agentree-env"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.store.busy_timeout_ms, 100);
    }
}
