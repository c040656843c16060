//! Agent model.
//!
//! [`Agent`] is the decoded form of one `Agents` row: the hex authority
//! mask, the bracketed grant list and the bracketed ancestry chain are
//! already typed. Raw column text never leaves [`super::repo`].

use agentree_auth::{Authority, CardTypeGrants};
use agentree_types::{bracket, AgentChain};
use serde::{Deserialize, Serialize};

use super::AgentError;

/// Lifecycle state of an agent.
///
/// ```text
/// Active ⇄ Disabled      (set_enabled)
/// Active | Disabled → Deleted   (delete_child, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Disabled,
    Deleted,
}

/// A reseller account within one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    /// Row id in the tenant database.
    #[serde(skip)]
    pub id: i64,
    /// Unique within the tenant.
    pub username: String,
    /// Stored as plain text by the legacy schema.
    #[serde(skip)]
    pub password: String,
    /// Credit balance.
    pub balance: f64,
    /// Time allowance in seconds.
    pub time_stock: i64,
    /// Administrative permissions.
    pub authority: Authority,
    /// Card types this agent may mint, as stored.
    pub card_type_grants: CardTypeGrants,
    /// Root first, this agent last.
    pub chain: AgentChain,
    /// Raw `Stat` code. 0 = enabled, 1 = disabled.
    pub stat: i64,
    /// Whether cards issued under this agent may be used.
    pub cards_enabled: bool,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Unix timestamp. 0 means never.
    pub expires_at: i64,
    /// Share (percent) this agent keeps of value passed down by its parent.
    pub own_rate: f64,
    /// Product of own rates from the tenant root down to this agent (percent).
    pub effective_rate: f64,
    /// Free-form note set by an ancestor or the agent itself.
    pub remark: String,
}

impl Agent {
    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        if self.deleted {
            AgentStatus::Deleted
        } else if self.stat == 0 {
            AgentStatus::Active
        } else {
            AgentStatus::Disabled
        }
    }

    /// `Stat == 0`.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.stat == 0
    }

    /// Returns `true` if the account has an expiry in the past.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != 0 && self.expires_at < now
    }

    /// Enabled, not deleted and not expired.
    #[must_use]
    pub fn is_valid(&self, now: i64) -> bool {
        self.is_enabled() && !self.deleted && !self.is_expired(now)
    }

    /// Direct parent's username, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.chain.parent()
    }

    /// Returns `true` if `ancestor` appears above this agent in its chain.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &str) -> bool {
        self.username != ancestor && self.chain.has_strict_ancestor(ancestor)
    }

    /// Returns `true` if `parent` is this agent's direct parent.
    #[must_use]
    pub fn is_direct_child_of(&self, parent: &str) -> bool {
        self.username != parent && self.chain.is_direct_parent(parent)
    }

    /// Returns `true` if the stored grant set names `card_type`.
    #[must_use]
    pub fn can_issue(&self, card_type: &str) -> bool {
        self.card_type_grants.contains(card_type)
    }
}

/// Effective rate of a child: `parent_effective × own_rate / 100`.
#[must_use]
pub fn child_effective_rate(parent_effective: f64, own_rate: f64) -> f64 {
    parent_effective * (own_rate / 100.0)
}

/// Effective rate of a tenant root.
pub const ROOT_EFFECTIVE_RATE: f64 = 100.0;

/// Input for creating an agent.
///
/// # Example
///
/// ```
/// use agentree_auth::Authority;
/// use agentree_runtime::agent::NewAgent;
///
/// let spec = NewAgent::new("reseller1", "secret")
///     .with_authority(Authority::GENERATE_CARD)
///     .with_grants(["day", "week"])
///     .with_own_rate(80.0);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    pub username: String,
    pub password: String,
    /// Requested authority; narrowed to the creator's own on creation.
    pub authority: Authority,
    /// Card types granted, stored as given.
    pub card_type_grants: CardTypeGrants,
    /// Percent in `0..=100`.
    pub own_rate: f64,
    /// Unix timestamp, 0 for never.
    pub expires_at: i64,
    pub remark: String,
}

impl NewAgent {
    /// New agent with no authority, no grants, rate 100 and no expiry.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            authority: Authority::empty(),
            card_type_grants: CardTypeGrants::new(),
            own_rate: 100.0,
            expires_at: 0,
            remark: String::new(),
        }
    }

    #[must_use]
    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    #[must_use]
    pub fn with_grants<I, S>(mut self, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.card_type_grants = grants.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_own_rate(mut self, own_rate: f64) -> Self {
        self.own_rate = own_rate;
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = expires_at;
        self
    }

    #[must_use]
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Checks the fields that cannot be persisted faithfully.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidRequest`] for a username that cannot be
    /// stored in a chain, or a negative or non-finite rate.
    pub fn validate(&self) -> Result<(), AgentError> {
        validate_username(&self.username)?;
        validate_rate(self.own_rate)?;
        if self.expires_at < 0 {
            return Err(AgentError::invalid("expiry must not be negative"));
        }
        Ok(())
    }
}

/// A username must survive the bracketed chain format unchanged.
pub(crate) fn validate_username(username: &str) -> Result<(), AgentError> {
    if !bracket::is_encodable(username) || username.contains(',') {
        return Err(AgentError::invalid(format!(
            "username {username:?} cannot be stored in an ancestry chain"
        )));
    }
    Ok(())
}

/// Rates above 100 are markups and allowed.
fn validate_rate(rate: f64) -> Result<(), AgentError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(AgentError::invalid(format!(
            "own rate {rate} must be a non-negative number"
        )));
    }
    Ok(())
}
