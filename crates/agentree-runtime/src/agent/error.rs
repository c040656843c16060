//! Agent operation errors.
//!
//! Every hierarchy, transfer and pricing operation fails with one
//! [`AgentError`] kind the caller can branch on. Precondition failures are
//! reported before any write happens.

use crate::store::StoreError;
use agentree_auth::{AccessDenied, AuthorityError};
use agentree_types::ErrorCode;
use thiserror::Error;

/// Failure of an agent operation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The acting agent does not exist or is deleted.
    #[error("acting agent '{0}' not found")]
    ActorNotFound(String),

    /// The would-be parent of a new agent does not exist or is deleted.
    #[error("parent agent '{0}' not found")]
    ParentNotFound(String),

    /// The target of a transfer or grant operation does not exist or is deleted.
    #[error("target agent '{0}' not found")]
    TargetNotFound(String),

    /// The named agent does not exist or is deleted.
    #[error("agent '{0}' not found")]
    NotFound(String),

    /// The username is already taken in this tenant (deleted rows included).
    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    /// The actor's authority does not allow the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] AccessDenied),

    /// The target is not a strict descendant of the actor.
    #[error("'{target}' is not a descendant of '{actor}'")]
    NotDescendant { actor: String, target: String },

    /// The target's direct parent is not the actor.
    #[error("'{target}' is not a direct child of '{actor}'")]
    NotDirectChild { actor: String, target: String },

    /// The agent still has non-deleted descendants.
    #[error("agent '{0}' still has sub-agents")]
    HasChildren(String),

    /// The actor's balance does not cover the transfer.
    #[error("insufficient balance: available {available:.2}, requested {requested:.2}")]
    InsufficientBalance { available: f64, requested: f64 },

    /// The actor's time stock does not cover the transfer (seconds).
    #[error("insufficient time: available {available}s, requested {requested}s")]
    InsufficientTime { available: i64, requested: i64 },

    /// The agent's grant set does not include the card type.
    #[error("agent '{agent}' is not granted card type '{card_type}'")]
    CardTypeNotGranted { agent: String, card_type: String },

    /// The card type does not exist in this tenant.
    #[error("card type '{0}' not found")]
    CardTypeNotFound(String),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stored authority mask is not valid hex.
    #[error(transparent)]
    MalformedAuthority(#[from] AuthorityError),

    /// The tenant store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl AgentError {
    /// Creates an invalid request error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(StoreError::Connection(e))
    }
}

impl ErrorCode for AgentError {
    fn code(&self) -> &'static str {
        match self {
            Self::ActorNotFound(_) => "AGENT_ACTOR_NOT_FOUND",
            Self::ParentNotFound(_) => "AGENT_PARENT_NOT_FOUND",
            Self::TargetNotFound(_) => "AGENT_TARGET_NOT_FOUND",
            Self::NotFound(_) => "AGENT_NOT_FOUND",
            Self::DuplicateUsername(_) => "AGENT_DUPLICATE_USERNAME",
            Self::PermissionDenied(_) => "AGENT_PERMISSION_DENIED",
            Self::NotDescendant { .. } => "AGENT_NOT_DESCENDANT",
            Self::NotDirectChild { .. } => "AGENT_NOT_DIRECT_CHILD",
            Self::HasChildren(_) => "AGENT_HAS_CHILDREN",
            Self::InsufficientBalance { .. } => "AGENT_INSUFFICIENT_BALANCE",
            Self::InsufficientTime { .. } => "AGENT_INSUFFICIENT_TIME",
            Self::CardTypeNotGranted { .. } => "AGENT_CARD_TYPE_NOT_GRANTED",
            Self::CardTypeNotFound(_) => "AGENT_CARD_TYPE_NOT_FOUND",
            Self::InvalidRequest(_) => "AGENT_INVALID_REQUEST",
            Self::MalformedAuthority(_) => "AGENT_MALFORMED_AUTHORITY",
            Self::StoreUnavailable(_) => "AGENT_STORE_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(e) if e.is_recoverable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentree_auth::Authority;
    use agentree_types::assert_error_code;

    fn all_variants() -> Vec<AgentError> {
        vec![
            AgentError::ActorNotFound("a".into()),
            AgentError::ParentNotFound("a".into()),
            AgentError::TargetNotFound("a".into()),
            AgentError::NotFound("a".into()),
            AgentError::DuplicateUsername("a".into()),
            AgentError::PermissionDenied(AccessDenied {
                operation: "op".into(),
                required: Authority::MANAGE_AGENT,
                available: Authority::empty(),
            }),
            AgentError::NotDescendant {
                actor: "a".into(),
                target: "b".into(),
            },
            AgentError::NotDirectChild {
                actor: "a".into(),
                target: "b".into(),
            },
            AgentError::HasChildren("a".into()),
            AgentError::InsufficientBalance {
                available: 1.0,
                requested: 2.0,
            },
            AgentError::InsufficientTime {
                available: 1,
                requested: 2,
            },
            AgentError::CardTypeNotGranted {
                agent: "a".into(),
                card_type: "day".into(),
            },
            AgentError::CardTypeNotFound("day".into()),
            AgentError::invalid("x"),
            AgentError::MalformedAuthority(Authority::decode_mask("zz").unwrap_err()),
            AgentError::from(rusqlite::Error::InvalidQuery),
        ]
    }

    #[test]
    fn codes_follow_convention() {
        for err in all_variants() {
            assert_error_code(&err, "AGENT_");
        }
    }

    #[test]
    fn only_store_failures_are_recoverable() {
        for err in all_variants() {
            let expected = matches!(err, AgentError::StoreUnavailable(_));
            assert_eq!(err.is_recoverable(), expected, "{err:?}");
        }
    }

    #[test]
    fn insufficient_balance_message() {
        let err = AgentError::InsufficientBalance {
            available: 10.0,
            requested: 40.0,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: available 10.00, requested 40.00"
        );
    }
}
