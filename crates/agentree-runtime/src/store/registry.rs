//! Per-tenant store registry.
//!
//! # Architecture
//!
//! ```text
//! StoreRegistry (one per process, passed by reference)
//! ├── data_dir/idc.db          ← default tenant + MultiSoftware catalog
//! ├── data_dir/idc_game-a.db   ← opened lazily on first get_store("game-a")
//! └── data_dir/idc_game-b.db
//! ```
//!
//! Handles are cached for the registry's lifetime. Concurrent first access
//! to the same tenant converges on one handle: check under the read lock,
//! then take the write lock and check again before opening.

use super::{StoreError, TenantStore};
use crate::config::{AgentreeConfig, StoreConfig};
use agentree_types::TenantId;
use parking_lot::RwLock;
use rusqlite::params;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One row of the tenant catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantEntry {
    /// Tenant name as stored.
    pub name: String,
    /// `State = 1` in the catalog.
    pub enabled: bool,
    /// Database file name recorded for the tenant.
    pub idc: String,
}

/// Resolves tenant ids to cached [`TenantStore`] handles.
#[derive(Debug)]
pub struct StoreRegistry {
    data_dir: PathBuf,
    default_tenant: TenantId,
    store: StoreConfig,
    stores: RwLock<HashMap<TenantId, TenantStore>>,
}

impl StoreRegistry {
    /// Creates a registry from loaded configuration. No file is opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTenant`] if the configured default tenant
    /// is not a valid tenant id.
    pub fn new(config: &AgentreeConfig) -> Result<Self, StoreError> {
        Ok(Self {
            data_dir: config.data_dir.clone(),
            default_tenant: TenantId::try_from(config.default_tenant.as_str())?,
            store: config.store.clone(),
            stores: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the tenant databases.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The tenant served by [`get_default_store`](Self::get_default_store).
    #[must_use]
    pub fn default_tenant(&self) -> &TenantId {
        &self.default_tenant
    }

    /// Database file name for `tenant`.
    #[must_use]
    pub fn file_name(&self, tenant: &TenantId) -> String {
        if *tenant == self.default_tenant {
            self.store.default_db_file.clone()
        } else {
            format!("{}{}.db", self.store.tenant_db_prefix, tenant)
        }
    }

    /// Full database path for `tenant`.
    #[must_use]
    pub fn store_path(&self, tenant: &TenantId) -> PathBuf {
        self.data_dir.join(self.file_name(tenant))
    }

    fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    /// Returns the cached handle for `tenant`, opening it on first access.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidTenant`] for an unusable tenant name
    /// - [`StoreError::NotFound`] / [`StoreError::Empty`] if the database file
    ///   is missing or zero-length
    /// - [`StoreError::Connection`] if the engine cannot open it
    pub fn get_store(&self, tenant: &str) -> Result<TenantStore, StoreError> {
        let tenant = TenantId::try_from(tenant)?;
        self.resolve(&tenant, |id, path, timeout| {
            TenantStore::open(id, path, timeout)
        })
    }

    /// Returns the default tenant's handle.
    ///
    /// # Errors
    ///
    /// Same as [`get_store`](Self::get_store).
    pub fn get_default_store(&self) -> Result<TenantStore, StoreError> {
        let tenant = self.default_tenant.clone();
        self.resolve(&tenant, |id, path, timeout| {
            TenantStore::open(id, path, timeout)
        })
    }

    /// Creates the tenant database if missing and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the tenant id is invalid or the file cannot
    /// be created.
    pub fn provision(&self, tenant: &str) -> Result<TenantStore, StoreError> {
        let tenant = TenantId::try_from(tenant)?;
        let store = self.resolve(&tenant, |id, path, timeout| {
            TenantStore::create(id, path, timeout)
        })?;
        info!(tenant = %tenant, path = %store.path().display(), "Provisioned tenant store");
        Ok(store)
    }

    /// Check, upgrade to exclusive, check again, create.
    fn resolve<F>(&self, tenant: &TenantId, open: F) -> Result<TenantStore, StoreError>
    where
        F: FnOnce(TenantId, PathBuf, Duration) -> Result<TenantStore, StoreError>,
    {
        if let Some(store) = self.stores.read().get(tenant) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write();
        if let Some(store) = stores.get(tenant) {
            return Ok(store.clone());
        }

        let store = open(tenant.clone(), self.store_path(tenant), self.busy_timeout())?;
        stores.insert(tenant.clone(), store.clone());
        debug!(tenant = %tenant, cached = stores.len(), "Cached tenant store handle");
        Ok(store)
    }

    /// Writes or updates a catalog row in the default tenant's database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the default store is unavailable or the
    /// write fails.
    pub fn register_tenant(&self, tenant: &str, enabled: bool) -> Result<(), StoreError> {
        let tenant = TenantId::try_from(tenant)?;
        let idc = self.file_name(&tenant);
        let catalog = self.get_default_store()?;
        catalog.write(|conn| {
            conn.execute(
                "INSERT INTO MultiSoftware (SoftwareName, State, idc) VALUES (?1, ?2, ?3)
                 ON CONFLICT (SoftwareName) DO UPDATE SET State = excluded.State, idc = excluded.idc",
                params![tenant.as_str(), i64::from(enabled), idc],
            )
            .map_err(StoreError::from)
        })?;
        info!(tenant = %tenant, enabled, "Registered tenant");
        Ok(())
    }

    /// Every catalog row, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the default store is unavailable.
    pub fn list_tenants(&self) -> Result<Vec<TenantEntry>, StoreError> {
        let catalog = self.get_default_store()?;
        catalog.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT SoftwareName, State, idc FROM MultiSoftware ORDER BY SoftwareName",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(TenantEntry {
                    name: row.get(0)?,
                    enabled: row.get::<_, Option<i64>>(1)?.unwrap_or(0) == 1,
                    idc: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
    }

    /// Handles for every enabled tenant in the catalog.
    ///
    /// Tenants whose name is invalid or whose store cannot be opened are
    /// skipped with a warning; the rest are still returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only if the catalog itself cannot be read.
    pub fn list_enabled_tenant_stores(&self) -> Result<BTreeMap<TenantId, TenantStore>, StoreError> {
        let mut result = BTreeMap::new();
        for entry in self.list_tenants()?.into_iter().filter(|e| e.enabled) {
            match self.get_store(&entry.name) {
                Ok(store) => {
                    result.insert(store.tenant().clone(), store);
                }
                Err(e) => {
                    warn!(tenant = %entry.name, error = %e, "Skipping tenant with unavailable store");
                }
            }
        }
        Ok(result)
    }

    /// Number of cached handles.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.stores.read().len()
    }

    /// Drops every cached handle and returns how many were released.
    ///
    /// Connections close once the last clone held by a caller is dropped.
    pub fn close_all(&self) -> usize {
        let mut stores = self.stores.write();
        let released = stores.len();
        stores.clear();
        info!(released, "Closed tenant store handles");
        released
    }
}
