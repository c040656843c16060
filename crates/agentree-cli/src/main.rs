//! agentree CLI - tenant and agent administration
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`AGENTREE_*`)
//! 3. Config file (`--config FILE`, default `agentree.toml` if present)
//! 4. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `AGENTREE_DATA_DIR`: Directory holding the tenant databases
//! - `AGENTREE_DEFAULT_TENANT`: Tenant used when `--tenant` is omitted
//! - `AGENTREE_BUSY_TIMEOUT_MS`: SQLite busy timeout
//! - `AGENTREE_LOG_LEVEL`: Log filter when neither `-d`, `-v` nor `RUST_LOG` is set
//!
//! # Output
//!
//! Every command prints one JSON object on stdout:
//!
//! ```text
//! {"success":true,"error":null,"payload":{...}}
//! {"success":false,"error":"AGENT_NOT_DESCENDANT","payload":null,"message":"..."}
//! ```
//!
//! and exits with status 1 when `success` is false. Logs go to stderr.

mod commands;

use agentree_runtime::config::{AgentreeConfig, ConfigLoader};
use agentree_runtime::store::StoreRegistry;
use anyhow::Result;
use clap::Parser;
use commands::{Command, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Config file picked up from the working directory when `--config` is omitted.
const DEFAULT_CONFIG_FILE: &str = "agentree.toml";

/// agentree - tenant and agent administration
#[derive(Parser, Debug)]
#[command(name = "agentree")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data directory (also: AGENTREE_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Tenant to operate on (defaults to the configured default tenant)
    #[arg(short, long, global = true)]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Loads file/env config and applies CLI overrides on top.
    fn resolve_config(&self) -> Result<AgentreeConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = ConfigLoader::new()
            .with_config_file(path)
            .load()
            .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

        if let Some(ref dir) = self.data_dir {
            config.data_dir.clone_from(dir);
        }
        Ok(config)
    }

    /// Terminal filter: --debug > --verbose > RUST_LOG > config level.
    fn log_filter(&self, config: &AgentreeConfig) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else if self.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(args.log_filter(&config)),
        )
        .init();

    debug!(data_dir = %config.data_dir.display(), "Resolved configuration");

    let registry = Arc::new(StoreRegistry::new(&config)?);
    let tenant = args
        .tenant
        .clone()
        .unwrap_or_else(|| registry.default_tenant().to_string());
    let ctx = Context::new(registry, tenant);

    if !commands::execute(args.command, &ctx)? {
        std::process::exit(1);
    }
    Ok(())
}
