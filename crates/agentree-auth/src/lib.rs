//! Authority primitives for agentree.
//!
//! What an agent may do is the combination of two layers:
//!
//! ```text
//! Effective permission = Authority(WHAT, bitmask) ∩ CardTypeGrants(WHICH card types)
//! ```
//!
//! | Layer | Type | Controls |
//! |-------|------|----------|
//! | [`Authority`] | Bitflags | Administrative operations (MANAGE_AGENT, GENERATE_CARD, ...) |
//! | [`CardTypeGrants`] | Ordered set | Card types the agent may mint |
//!
//! Both layers narrow on the way down the tree. Authority is narrowed once at
//! creation ([`Authority::inherit`]). Grants are stored raw and narrowed at
//! read time ([`CardTypeGrants::intersect`]).
//!
//! # Crate Architecture
//!
//! ```text
//! agentree-types  (TenantId, AgentChain, ErrorCode)
//!        ↑
//! agentree-auth   ◄── THIS CRATE
//! (Authority, CardTypeGrants, AccessDenied)
//!        ↑
//! agentree-runtime (HierarchyService, TransferService enforce these)
//! ```
//!
//! Nothing here touches storage; decoding and checks are pure.

pub mod authority;
pub mod error;
pub mod grant;

pub use authority::Authority;
pub use error::{AccessDenied, AuthorityError};
pub use grant::CardTypeGrants;
