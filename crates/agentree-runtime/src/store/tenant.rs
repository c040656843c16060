//! Tenant store handle.
//!
//! One SQLite connection per tenant, shared by every operation against that
//! tenant. The connection sits behind a mutex, so statements from different
//! workers never interleave on it. Writes additionally run inside an
//! `IMMEDIATE` transaction, which takes the database write lock up front and
//! serializes against other processes opening the same file.

use super::{schema, StoreError};
use agentree_types::TenantId;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared handle to one tenant's database.
///
/// Cloning is cheap and every clone refers to the same connection.
#[derive(Debug, Clone)]
pub struct TenantStore {
    tenant: TenantId,
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl TenantStore {
    /// Opens an existing tenant database.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the file does not exist
    /// - [`StoreError::Empty`] if the file is zero-length
    /// - [`StoreError::Connection`] if the engine cannot open it
    pub fn open(
        tenant: TenantId,
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    tenant: tenant.to_string(),
                    path,
                });
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        if metadata.len() == 0 {
            return Err(StoreError::Empty {
                tenant: tenant.to_string(),
                path,
            });
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::initialize(tenant, path, conn, busy_timeout)
    }

    /// Creates the tenant database (and its directory) if missing, then opens it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created, or
    /// [`StoreError::Connection`] if the engine fails.
    pub fn create(
        tenant: TenantId,
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::initialize(tenant, path, conn, busy_timeout)
    }

    fn initialize(
        tenant: TenantId,
        path: PathBuf,
        conn: Connection,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout)?;
        schema::apply(&conn)?;
        debug!(tenant = %tenant, path = %path.display(), "Opened tenant store");
        Ok(Self {
            tenant,
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Tenant this store belongs to.
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live handles sharing this connection.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.conn)
    }

    /// Returns `true` if both handles share one connection.
    #[must_use]
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }

    /// Runs `f` against the connection outside any explicit transaction.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back otherwise,
    /// so every write `f` made is undone on any failure.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or [`StoreError::Connection`] (converted
    /// into `E`) if the transaction cannot begin or commit.
    pub fn write<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(&*tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}
