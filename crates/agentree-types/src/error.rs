//! Unified error interface for agentree.
//!
//! This module provides the [`ErrorCode`] trait for standardized
//! error handling across all agentree crates.
//!
//! # Design
//!
//! All agentree error types implement [`ErrorCode`] to provide:
//!
//! - **Machine-readable codes**: the stable error kind a caller branches on
//! - **Recoverability info**: whether retrying the same call can succeed
//!
//! Human-readable text (`Display`) is a presentation concern; the code is
//! the contract.
//!
//! # Example
//!
//! ```
//! use agentree_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum LookupError {
//!     Missing(String),
//!     Busy,
//! }
//!
//! impl ErrorCode for LookupError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing(_) => "LOOKUP_MISSING",
//!             Self::Busy => "LOOKUP_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = LookupError::Busy;
//! assert_eq!(err.code(), "LOOKUP_BUSY");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface for agentree errors.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"AGENT_NOT_DESCENDANT"`
/// - **Namespace-prefixed**: `"AGENT_"`, `"STORE_"`, `"AUTH_"`, `"CONFIG_"`
/// - **Stable**: codes are an API contract and do not change once defined
///
/// # Recoverability
///
/// An error is recoverable if retrying the operation may succeed without
/// the caller changing its input, e.g. a tenant store that was briefly
/// unavailable. Authorization and precondition failures are never
/// recoverable: the same request fails the same way.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows agentree conventions.
///
/// # Checks
///
/// 1. Code is not empty
/// 2. Code starts with the expected prefix
/// 3. Code is UPPER_SNAKE_CASE
///
/// # Panics
///
/// Panics with a descriptive message if validation fails.
///
/// # Example
///
/// ```
/// use agentree_types::{ErrorCode, assert_error_code};
///
/// #[derive(Debug)]
/// enum StoreFault { Locked }
///
/// impl ErrorCode for StoreFault {
///     fn code(&self) -> &'static str { "STORE_LOCKED" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&StoreFault::Locked, "STORE_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");

    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );

    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify every variant of an error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    if s.starts_with('_') || s.ends_with('_') {
        return false;
    }

    if s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
