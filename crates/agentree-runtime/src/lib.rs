//! agentree runtime: tenant stores and the agent tree.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  agentree-types : TenantId, AgentChain, ErrorCode            │
//! │  agentree-auth  : Authority, CardTypeGrants, AccessDenied    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config/  : AgentreeConfig, ConfigLoader                     │
//! │  store/   : TenantStore, StoreRegistry                       │
//! │  agent/   : Agent, HierarchyService, TransferService         │
//! │  pricing  : CardType, PricingService                         │
//! │  session  : ActorSession                                     │
//! │  outcome  : Outcome result triple                            │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Frontend Layer                             │
//! │  (agentree-cli)                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`store`] - Tenant Stores
//!
//! One SQLite database per tenant. A [`StoreRegistry`](store::StoreRegistry)
//! is created once per process and shared by every service; it opens tenant
//! databases lazily and caches the handles.
//!
//! ## [`agent`] - Agent Tree
//!
//! - [`HierarchyService`](agent::HierarchyService): listing, creation,
//!   status, remarks, deletion, grants and authority of descendants
//! - [`TransferService`](agent::TransferService): atomic balance/time
//!   transfers to descendants
//!
//! ## [`pricing`] - Card Prices
//!
//! Base prices scaled by an agent's effective rate.
//!
//! ## [`session`] - Actor Identity
//!
//! Username/password sign-in across every enabled tenant.
//!
//! # Example
//!
//! ```no_run
//! use agentree_runtime::agent::{HierarchyService, TransferRequest, TransferService};
//! use agentree_runtime::config::ConfigLoader;
//! use agentree_runtime::store::StoreRegistry;
//! use std::sync::Arc;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! let registry = Arc::new(StoreRegistry::new(&config).unwrap());
//!
//! let hierarchy = HierarchyService::new(Arc::clone(&registry));
//! let children = hierarchy.list_descendants("default", "admin", true).unwrap();
//!
//! let transfers = TransferService::new(registry);
//! for child in &children {
//!     transfers
//!         .transfer("default", "admin", &child.username, TransferRequest::balance(10.0))
//!         .unwrap();
//! }
//! ```

pub mod agent;
pub mod config;
mod outcome;
pub mod pricing;
pub mod session;
pub mod store;

pub use outcome::Outcome;
