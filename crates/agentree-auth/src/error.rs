//! Authority errors.
//!
//! Two failure kinds leave this crate:
//!
//! ```text
//! stored mask text ──decode──► Authority        AuthorityError::Malformed
//! Authority ──check──► operation allowed?       AccessDenied
//! ```

use crate::Authority;
use agentree_types::ErrorCode;
use std::num::ParseIntError;
use thiserror::Error;

/// A persisted authority mask could not be decoded.
///
/// Distinct from an empty mask: an empty string decodes to "no permissions",
/// while garbage text is reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The mask text is not valid hexadecimal.
    #[error("malformed authority mask {raw:?}: not an unsigned hex number")]
    Malformed {
        /// The text as stored.
        raw: String,
        /// Parse failure, absent when a non-hex character was rejected up front.
        source: Option<ParseIntError>,
    },
}

impl ErrorCode for AuthorityError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "AUTH_MALFORMED_MASK",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// An agent attempted an operation its authority does not allow.
///
/// # Example
///
/// ```
/// use agentree_auth::{AccessDenied, Authority};
///
/// let err = AccessDenied::check(
///     "create_child",
///     Authority::MANAGE_AGENT,
///     Authority::GENERATE_CARD,
/// )
/// .unwrap_err();
///
/// assert!(err.to_string().contains("create_child"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{operation}' requires {required}, available: {available}")]
pub struct AccessDenied {
    /// The operation that was attempted.
    pub operation: String,
    /// Authority required for the operation.
    pub required: Authority,
    /// Authority the agent actually holds.
    pub available: Authority,
}

impl AccessDenied {
    /// Succeeds if `available` holds every bit of `required`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] naming the operation otherwise.
    pub fn check(
        operation: impl Into<String>,
        required: Authority,
        available: Authority,
    ) -> Result<(), Self> {
        if available.has_permission(required) {
            Ok(())
        } else {
            Err(Self {
                operation: operation.into(),
                required,
                available,
            })
        }
    }

    /// Bits that were required but missing.
    #[must_use]
    pub fn missing(&self) -> Authority {
        self.required - self.available
    }
}

impl ErrorCode for AccessDenied {
    fn code(&self) -> &'static str {
        "AUTH_ACCESS_DENIED"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentree_types::assert_error_code;

    #[test]
    fn malformed_display_names_raw_text() {
        let err = Authority::decode_mask("xyz").expect_err("not hex");
        let msg = err.to_string();
        assert!(msg.contains("xyz"), "got: {msg}");
        assert_eq!(err.code(), "AUTH_MALFORMED_MASK");
    }

    #[test]
    fn check_allows_held_bits() {
        let held = Authority::MANAGE_AGENT | Authority::GENERATE_CARD;
        assert!(AccessDenied::check("op", Authority::MANAGE_AGENT, held).is_ok());
    }

    #[test]
    fn check_reports_missing_bits() {
        let err = AccessDenied::check(
            "set_authority",
            Authority::MANAGE_AGENT | Authority::UNBIND_CARD,
            Authority::MANAGE_AGENT,
        )
        .expect_err("missing UNBIND_CARD");
        assert_eq!(err.missing(), Authority::UNBIND_CARD);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn codes_follow_convention() {
        let malformed = Authority::decode_mask("q").expect_err("not hex");
        let denied = AccessDenied {
            operation: "x".into(),
            required: Authority::MANAGE_AGENT,
            available: Authority::empty(),
        };
        assert_error_code(&malformed, "AUTH_");
        assert_error_code(&denied, "AUTH_");
    }
}
