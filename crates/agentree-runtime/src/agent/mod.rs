//! Agents: model, hierarchy operations and transfers.
//!
//! # Layout
//!
//! ```text
//! HierarchyService ─┐
//! TransferService ──┼──► repo (SQL, row decoding) ──► TenantStore
//! PricingService ───┘
//! ```
//!
//! Services hold an `Arc<StoreRegistry>` and resolve the tenant store per
//! call. Rows are decoded into [`Agent`] inside `repo`; a stored authority
//! mask that is not hex surfaces as [`AgentError::MalformedAuthority`].

mod error;
mod hierarchy;
mod model;
pub(crate) mod repo;
mod transfer;

pub use error::AgentError;
pub use hierarchy::{DescendantPage, DescendantQuery, DescendantScope, HierarchyService, MatchMode};
pub use model::{child_effective_rate, Agent, AgentStatus, NewAgent, ROOT_EFFECTIVE_RATE};
pub use transfer::{TransferReceipt, TransferRequest, TransferService, SECONDS_PER_HOUR};

pub(crate) use hierarchy::{logged, require_actor};
