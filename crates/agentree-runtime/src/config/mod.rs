//! Configuration management with layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────┐
//! │  1. Environment Variables (AGENTREE_*)  │  Runtime override
//! ├─────────────────────────────────────────┤
//! │  2. Config file (--config <path>)       │  Deployment settings
//! ├─────────────────────────────────────────┤
//! │  3. Default Values (compile-time)       │  Fallback
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Data Directory
//!
//! ```text
//! <data_dir>/
//! ├── idc.db            # default tenant + MultiSoftware tenant catalog
//! ├── idc_game-a.db     # tenant "game-a"
//! └── idc_game-b.db     # tenant "game-b"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `AGENTREE_DATA_DIR` | `data_dir` | PathBuf |
//! | `AGENTREE_DEFAULT_TENANT` | `default_tenant` | String |
//! | `AGENTREE_BUSY_TIMEOUT_MS` | `store.busy_timeout_ms` | u64 |
//! | `AGENTREE_LOG_LEVEL` | `logging.level` | String |
//!
//! # Example Configuration
//!
//! ```toml
//! data_dir = "/var/lib/agentree"
//! default_tenant = "default"
//!
//! [store]
//! default_db_file = "idc.db"
//! tenant_db_prefix = "idc_"
//! busy_timeout_ms = 5000
//!
//! [logging]
//! level = "warn"
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{
    ConfigLoader, ENV_BUSY_TIMEOUT_MS, ENV_DATA_DIR, ENV_DEFAULT_TENANT, ENV_LOG_LEVEL,
};
pub use types::{AgentreeConfig, LoggingConfig, StoreConfig};
