//! Tenant identifiers.
//!
//! A tenant ("software position") is an isolated namespace with its own
//! agent store. The tenant id doubles as part of the store's file name, so
//! it is validated on construction.

use crate::TryNew;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rejection reasons for a tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantIdError {
    /// The id is empty or whitespace only.
    #[error("tenant id must not be empty")]
    Empty,

    /// The id contains a character that cannot appear in a store file name.
    #[error("tenant id contains forbidden character {0:?}")]
    ForbiddenChar(char),

    /// The id is a relative path component (`.` or `..`).
    #[error("tenant id must not be a relative path component")]
    RelativeComponent,
}

/// Identifier of a tenant.
///
/// # Example
///
/// ```
/// use agentree_types::{TenantId, TryNew};
///
/// let tenant = TenantId::try_new("game-a".into()).unwrap();
/// assert_eq!(tenant.as_str(), "game-a");
///
/// assert!(TenantId::try_new("../etc".into()).is_err());
/// assert!(TenantId::try_new(String::new()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryNew for TenantId {
    type Error = TenantIdError;
    type Args = String;

    fn try_new(raw: String) -> Result<Self, Self::Error> {
        Self::try_from(raw)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.trim().is_empty() {
            return Err(TenantIdError::Empty);
        }
        if raw == "." || raw == ".." {
            return Err(TenantIdError::RelativeComponent);
        }
        if let Some(c) = raw
            .chars()
            .find(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
        {
            return Err(TenantIdError::ForbiddenChar(c));
        }
        Ok(Self(raw))
    }
}

impl TryFrom<&str> for TenantId {
    type Error = TenantIdError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::try_from(raw.to_string())
    }
}

impl std::str::FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
