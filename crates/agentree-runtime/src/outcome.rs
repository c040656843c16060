//! Operation result triple.
//!
//! Frontends render every operation as `(success, error kind, payload)`.
//! The error kind is the stable [`ErrorCode::code`] of the failure; the
//! human-readable message travels separately and is not part of the triple.

use agentree_types::ErrorCode;
use serde::Serialize;

/// Serializable result of one operation.
///
/// # Example
///
/// ```
/// use agentree_runtime::agent::AgentError;
/// use agentree_runtime::Outcome;
///
/// let failed: Outcome<()> = Outcome::from(Err::<(), _>(AgentError::NotFound("x".into())));
/// assert!(!failed.success);
/// assert_eq!(failed.error, Some("AGENT_NOT_FOUND"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    pub error: Option<&'static str>,
    pub payload: Option<T>,
    /// Display text of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            error: None,
            payload: Some(payload),
            message: None,
        }
    }

    #[must_use]
    pub fn failed<E: ErrorCode + std::fmt::Display>(err: &E) -> Self {
        Self {
            success: false,
            error: Some(err.code()),
            payload: None,
            message: Some(err.to_string()),
        }
    }
}

impl<T, E: ErrorCode + std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::failed(&e),
        }
    }
}
