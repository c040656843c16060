//! Tenant stores.
//!
//! Each tenant ("software position") owns one SQLite database holding its
//! agents and card types. [`StoreRegistry`] resolves a tenant id to a cached
//! [`TenantStore`] handle; services take the registry by reference.
//!
//! ```text
//! HierarchyService ─┐
//! TransferService  ─┼─► StoreRegistry::get_store(tenant) ─► TenantStore
//! PricingService   ─┘                                          │
//!                                                  read() / write() (IMMEDIATE tx)
//! ```

mod error;
mod registry;
pub mod schema;
mod tenant;

pub use error::StoreError;
pub use registry::{StoreRegistry, TenantEntry};
pub use tenant::TenantStore;
