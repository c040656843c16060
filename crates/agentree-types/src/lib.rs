//! Core types for agentree.
//!
//! This crate sits at the bottom of the workspace and carries the types
//! every other layer speaks:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  agentree-types   : TenantId, AgentChain, ErrorCode  ◄── HERE│
//! │  agentree-auth    : Authority bitmask, CardTypeGrants        │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  agentree-runtime : stores, hierarchy, transfers, pricing    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  agentree-cli     : admin command line                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Persisted text, typed values
//!
//! Agent rows store their ancestry and grant sets as bracketed lists
//! (`[admin],[reseller1]`). The [`bracket`] module owns that text format and
//! [`AgentChain`] is the decoded ancestry chain. Services decode once at the
//! store boundary and pass typed values from there on.
//!
//! # Example
//!
//! ```
//! use agentree_types::{AgentChain, TenantId};
//!
//! let tenant = TenantId::try_from("default").unwrap();
//! let root = AgentChain::root("admin");
//! let reseller = root.child("reseller1");
//!
//! assert_eq!(tenant.as_str(), "default");
//! assert!(reseller.is_direct_parent("admin"));
//! ```

pub mod bracket;
pub mod chain;
mod construct;
mod error;
mod tenant;

pub use chain::AgentChain;
pub use construct::TryNew;
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use tenant::{TenantId, TenantIdError};
