//! Actor sessions.
//!
//! An agent signs in once with a username and password. The same username
//! may exist in several tenants; the session keeps the agent row of every
//! enabled tenant where the credentials match and the account is valid.
//!
//! ```text
//! establish(user, pw)
//!   └─ for each enabled tenant store
//!        row = live agent named `user`
//!        keep if row.password == pw && row.is_valid(now)
//! ```
//!
//! Rows are cached at establishment. Services re-read what they need, and
//! [`ActorSession::refresh`] updates the cached copy explicitly.

use crate::agent::{repo, Agent, AgentError};
use crate::store::{StoreError, StoreRegistry};
use agentree_types::{ErrorCode, TenantId};
use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No enabled tenant holds a valid account with these credentials.
    #[error("no valid account for '{0}'")]
    NoValidAccount(String),

    /// The old password did not match.
    #[error("wrong password")]
    WrongPassword,

    /// The session holds no account in this tenant.
    #[error("session has no account in tenant '{0}'")]
    TenantNotInSession(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoValidAccount(_) => "SESSION_NO_VALID_ACCOUNT",
            Self::WrongPassword => "SESSION_WRONG_PASSWORD",
            Self::TenantNotInSession(_) => "SESSION_TENANT_NOT_IN_SESSION",
            Self::Agent(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Agent(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

/// An authenticated agent and its rows per tenant.
#[derive(Debug, Clone)]
pub struct ActorSession {
    username: String,
    agents: BTreeMap<TenantId, Agent>,
}

impl ActorSession {
    /// Signs in at the current time.
    ///
    /// # Errors
    ///
    /// See [`establish_at`](Self::establish_at).
    pub fn establish(
        registry: &StoreRegistry,
        username: &str,
        password: &str,
    ) -> Result<Self, SessionError> {
        Self::establish_at(registry, username, password, Utc::now().timestamp())
    }

    /// Signs in, judging expiry against `now` (unix seconds).
    ///
    /// Tenants whose row cannot be read are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoValidAccount`] if no tenant matched;
    /// [`SessionError::Store`] if the tenant catalog cannot be read.
    pub fn establish_at(
        registry: &StoreRegistry,
        username: &str,
        password: &str,
        now: i64,
    ) -> Result<Self, SessionError> {
        let mut agents = BTreeMap::new();
        for (tenant, store) in registry.list_enabled_tenant_stores()? {
            match store.read(|conn| repo::find_live(conn, username)) {
                Ok(Some(agent)) if agent.password == password && agent.is_valid(now) => {
                    debug!(tenant = %tenant, username, "account matched");
                    agents.insert(tenant, agent);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(tenant = %tenant, username, code = e.code(), "skipping tenant: {e}");
                }
            }
        }

        if agents.is_empty() {
            warn!(username, "sign-in rejected");
            return Err(SessionError::NoValidAccount(username.into()));
        }
        info!(username, tenants = agents.len(), "session established");
        Ok(Self {
            username: username.into(),
            agents,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Tenants this session holds an account in.
    pub fn tenants(&self) -> impl Iterator<Item = &TenantId> {
        self.agents.keys()
    }

    /// The cached row for `tenant`.
    #[must_use]
    pub fn agent(&self, tenant: &str) -> Option<&Agent> {
        self.agents
            .iter()
            .find(|(id, _)| id.as_str() == tenant)
            .map(|(_, agent)| agent)
    }

    fn tenant_id(&self, tenant: &str) -> Result<TenantId, SessionError> {
        self.agents
            .keys()
            .find(|id| id.as_str() == tenant)
            .cloned()
            .ok_or_else(|| SessionError::TenantNotInSession(tenant.into()))
    }

    /// Re-reads the row for `tenant`.
    ///
    /// A row that was deleted since sign-in is dropped from the session.
    ///
    /// # Errors
    ///
    /// [`SessionError::TenantNotInSession`], or
    /// [`AgentError::ActorNotFound`] if the row is gone.
    pub fn refresh(
        &mut self,
        registry: &StoreRegistry,
        tenant: &str,
    ) -> Result<&Agent, SessionError> {
        let id = self.tenant_id(tenant)?;
        let store = registry.get_store(tenant)?;
        let username = self.username.clone();
        let fresh = store.read(|conn| repo::find_live(conn, &username))?;
        match fresh {
            Some(agent) => {
                self.agents.insert(id.clone(), agent);
                self.agents
                    .get(&id)
                    .ok_or_else(|| SessionError::TenantNotInSession(tenant.into()))
            }
            None => {
                self.agents.remove(&id);
                Err(AgentError::ActorNotFound(username).into())
            }
        }
    }

    /// Replaces the password in `tenant` after checking the old one
    /// against the stored row.
    ///
    /// # Errors
    ///
    /// [`SessionError::WrongPassword`], [`SessionError::TenantNotInSession`],
    /// or [`AgentError::InvalidRequest`] for an empty new password.
    pub fn change_password(
        &mut self,
        registry: &StoreRegistry,
        tenant: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        if new_password.is_empty() {
            return Err(AgentError::invalid("new password must not be empty").into());
        }
        let id = self.tenant_id(tenant)?;
        let store = registry.get_store(tenant)?;
        let username = self.username.clone();
        store.write(|conn| -> Result<(), SessionError> {
            let agent = repo::find_live(conn, &username)?
                .ok_or_else(|| AgentError::ActorNotFound(username.clone()))?;
            if agent.password != old_password {
                return Err(SessionError::WrongPassword);
            }
            repo::set_password(conn, agent.id, new_password)?;
            Ok(())
        })?;

        if let Some(agent) = self.agents.get_mut(&id) {
            agent.password = new_password.to_string();
        }
        info!(tenant, username = %self.username, "password changed");
        Ok(())
    }
}
