//! Tenant store errors.

use agentree_types::{ErrorCode, TenantIdError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure to resolve, open or query a tenant store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tenant's database file does not exist.
    #[error("store for tenant '{tenant}' not found at {path}")]
    NotFound { tenant: String, path: PathBuf },

    /// The tenant's database file exists but is zero-length.
    #[error("store for tenant '{tenant}' is empty: {path}")]
    Empty { tenant: String, path: PathBuf },

    /// The tenant name cannot be used as a store id.
    #[error("invalid tenant id: {0}")]
    InvalidTenant(#[from] TenantIdError),

    /// The database engine reported an error.
    #[error("store connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    /// A single-row write touched some other number of rows.
    #[error("expected {expected} row(s) changed, got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    /// Filesystem error around the database file.
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Creates an io error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "STORE_NOT_FOUND",
            Self::Empty { .. } => "STORE_EMPTY",
            Self::InvalidTenant(_) => "STORE_INVALID_TENANT",
            Self::Connection(_) => "STORE_CONNECTION",
            Self::Io { .. } => "STORE_IO",
            Self::UnexpectedRowCount { .. } => "STORE_UNEXPECTED_ROW_COUNT",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentree_types::assert_error_code;

    #[test]
    fn codes_follow_convention() {
        let errors = [
            StoreError::NotFound {
                tenant: "t".into(),
                path: PathBuf::from("/x/idc_t.db"),
            },
            StoreError::Empty {
                tenant: "t".into(),
                path: PathBuf::from("/x/idc_t.db"),
            },
            StoreError::InvalidTenant(TenantIdError::Empty),
            StoreError::Connection(rusqlite::Error::QueryReturnedNoRows),
            StoreError::io("/x", std::io::Error::other("boom")),
            StoreError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            },
        ];
        for err in &errors {
            assert_error_code(err, "STORE_");
        }
    }

    #[test]
    fn only_engine_and_io_failures_are_recoverable() {
        assert!(StoreError::Connection(rusqlite::Error::InvalidQuery).is_recoverable());
        assert!(!StoreError::InvalidTenant(TenantIdError::Empty).is_recoverable());
        let drift = StoreError::UnexpectedRowCount {
            expected: 1,
            actual: 2,
        };
        assert!(!drift.is_recoverable());
    }

    #[test]
    fn not_found_names_path() {
        let err = StoreError::NotFound {
            tenant: "game".into(),
            path: PathBuf::from("/data/idc_game.db"),
        };
        assert!(err.to_string().contains("/data/idc_game.db"));
    }
}
