//! Agent hierarchy service.
//!
//! Tenant-scoped lookups and mutations of the agent tree. Every mutation
//! runs in one write transaction on the tenant store: the actor and target
//! rows are re-read inside it and all preconditions are checked before the
//! first write.
//!
//! # Authorization
//!
//! ```text
//! create_child / delete_child / set_enabled / grants / authority
//!     actor must hold MANAGE_AGENT
//!
//! target scope
//!     delete_child          direct child only
//!     everything else       any strict descendant
//!     update_remark         self or any strict descendant
//! ```

use super::model::{child_effective_rate, Agent, NewAgent};
use super::{repo, AgentError};
use crate::store::{StoreRegistry, TenantStore};
use agentree_auth::{AccessDenied, Authority, CardTypeGrants};
use agentree_types::{AgentChain, ErrorCode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which descendants a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescendantScope {
    /// Agents whose direct parent is the actor.
    #[default]
    Direct,
    /// Every transitive descendant.
    All,
}

/// How a listing keyword is matched against usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    /// Substring match.
    Fuzzy,
}

/// Filter and paging for [`HierarchyService::search_descendants`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescendantQuery {
    pub scope: DescendantScope,
    /// Empty matches everyone.
    pub keyword: String,
    pub match_mode: MatchMode,
    /// 1-based. 0 is treated as 1.
    pub page: usize,
    /// 0 returns every match.
    pub limit: usize,
}

impl DescendantQuery {
    #[must_use]
    pub fn new(scope: DescendantScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>, mode: MatchMode) -> Self {
        self.keyword = keyword.into();
        self.match_mode = mode;
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    fn matches(&self, username: &str) -> bool {
        if self.keyword.is_empty() {
            return true;
        }
        match self.match_mode {
            MatchMode::Exact => username == self.keyword,
            MatchMode::Fuzzy => username.contains(self.keyword.as_str()),
        }
    }
}

/// One page of a descendant listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescendantPage {
    pub items: Vec<Agent>,
    /// Matches before paging.
    pub total: usize,
}

/// Tree operations over the tenant stores of one registry.
///
/// # Example
///
/// ```no_run
/// use agentree_runtime::agent::{HierarchyService, NewAgent};
/// use agentree_runtime::config::AgentreeConfig;
/// use agentree_runtime::store::StoreRegistry;
/// use std::sync::Arc;
///
/// let registry = Arc::new(StoreRegistry::new(&AgentreeConfig::default()).unwrap());
/// let hierarchy = HierarchyService::new(registry);
///
/// let child = hierarchy
///     .create_child("default", "admin", NewAgent::new("reseller1", "secret"))
///     .unwrap();
/// assert_eq!(child.parent(), Some("admin"));
/// ```
#[derive(Debug, Clone)]
pub struct HierarchyService {
    registry: Arc<StoreRegistry>,
}

impl HierarchyService {
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    fn store(&self, tenant: &str) -> Result<TenantStore, AgentError> {
        Ok(self.registry.get_store(tenant)?)
    }

    /// The current non-deleted row for `username`.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotFound`] if missing or deleted.
    pub fn get_agent(&self, tenant: &str, username: &str) -> Result<Agent, AgentError> {
        let store = self.store(tenant)?;
        let agent = store.read(|conn| {
            repo::find_live(conn, username)?.ok_or_else(|| AgentError::NotFound(username.into()))
        });
        logged(agent, "get_agent", tenant)
    }

    /// Enabled or disabled descendants of `actor`, in creation order.
    ///
    /// `direct_only` restricts the listing to agents whose direct parent is
    /// `actor`. The actor itself is never listed.
    ///
    /// # Errors
    ///
    /// [`AgentError::MalformedAuthority`] if a listed row has an undecodable
    /// mask; store failures otherwise.
    pub fn list_descendants(
        &self,
        tenant: &str,
        actor: &str,
        direct_only: bool,
    ) -> Result<Vec<Agent>, AgentError> {
        let scope = if direct_only {
            DescendantScope::Direct
        } else {
            DescendantScope::All
        };
        let page = self.search_descendants(tenant, actor, &DescendantQuery::new(scope))?;
        Ok(page.items)
    }

    /// Filtered and paged descendant listing.
    ///
    /// # Errors
    ///
    /// Same as [`list_descendants`](Self::list_descendants).
    pub fn search_descendants(
        &self,
        tenant: &str,
        actor: &str,
        query: &DescendantQuery,
    ) -> Result<DescendantPage, AgentError> {
        let store = self.store(tenant)?;
        let rows = logged(store.read(repo::listable_rows), "search_descendants", tenant)?;

        let matched: Vec<_> = rows
            .into_iter()
            .filter(|row| row.username() != actor && query.matches(row.username()))
            .filter(|row| {
                let chain = row.chain();
                match query.scope {
                    DescendantScope::Direct => chain.is_direct_parent(actor),
                    DescendantScope::All => chain.contains(actor),
                }
            })
            .collect();

        let total = matched.len();
        let (skip, take) = if query.limit == 0 {
            (0, total)
        } else {
            (query.page.max(1).saturating_sub(1).saturating_mul(query.limit), query.limit)
        };
        let items = matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(repo::AgentRow::decode)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            tenant,
            actor,
            scope = ?query.scope,
            total,
            returned = items.len(),
            "listed descendants"
        );
        Ok(DescendantPage { items, total })
    }

    /// Listing with the scope chosen by the actor's authority:
    /// everything for VIEW_ALL_DESCENDANTS, direct children otherwise.
    ///
    /// # Errors
    ///
    /// [`AgentError::ActorNotFound`] if the actor is missing or deleted.
    pub fn visible_descendants(
        &self,
        tenant: &str,
        actor: &str,
        query: DescendantQuery,
    ) -> Result<DescendantPage, AgentError> {
        let store = self.store(tenant)?;
        let actor_row = logged(
            store.read(|conn| require_actor(conn, actor)),
            "visible_descendants",
            tenant,
        )?;
        let scope = if actor_row
            .authority
            .has_permission(Authority::VIEW_ALL_DESCENDANTS)
        {
            DescendantScope::All
        } else {
            DescendantScope::Direct
        };
        self.search_descendants(tenant, actor, &DescendantQuery { scope, ..query })
    }

    /// Creates a direct child of `actor`.
    ///
    /// The child's chain is the actor's chain plus its own name, its
    /// effective rate is `actor.effective_rate × own_rate / 100` and its
    /// authority is the requested one narrowed to the actor's. Balance and
    /// time start at zero.
    ///
    /// An actor row stored without a chain is treated as a root, so its
    /// child's chain is `[actor],[child]`.
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::InvalidRequest`], [`AgentError::DuplicateUsername`]
    /// (deleted rows included), [`AgentError::ParentNotFound`],
    /// [`AgentError::PermissionDenied`].
    pub fn create_child(
        &self,
        tenant: &str,
        actor: &str,
        spec: NewAgent,
    ) -> Result<Agent, AgentError> {
        spec.validate()?;
        let store = self.store(tenant)?;
        let created = store.write(|conn| {
            if repo::username_exists(conn, &spec.username)? {
                return Err(AgentError::DuplicateUsername(spec.username.clone()));
            }
            let parent = repo::find_live(conn, actor)?
                .ok_or_else(|| AgentError::ParentNotFound(actor.into()))?;
            AccessDenied::check("create_child", Authority::MANAGE_AGENT, parent.authority)?;

            let chain = lineage(&parent).child(spec.username.as_str());
            let authority = Authority::inherit(parent.authority, spec.authority);
            let effective_rate = child_effective_rate(parent.effective_rate, spec.own_rate);
            repo::insert(conn, &spec, authority, &chain, effective_rate)?;

            repo::find_live(conn, &spec.username)?
                .ok_or_else(|| AgentError::NotFound(spec.username.clone()))
        });
        let created = logged(created, "create_child", tenant)?;

        info!(
            tenant,
            actor,
            child = %created.username,
            effective_rate = created.effective_rate,
            "created agent"
        );
        Ok(created)
    }

    /// Seeds a tenant's top-level agent with an opening balance and time.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidRequest`] for bad input or a negative balance,
    /// [`AgentError::DuplicateUsername`] if the name is taken.
    pub fn create_root(
        &self,
        tenant: &str,
        spec: NewAgent,
        balance: f64,
        hours: u32,
    ) -> Result<Agent, AgentError> {
        spec.validate()?;
        if !balance.is_finite() || balance < 0.0 {
            return Err(AgentError::invalid("opening balance must be non-negative"));
        }
        let store = self.store(tenant)?;
        let created = store.write(|conn| {
            if repo::username_exists(conn, &spec.username)? {
                return Err(AgentError::DuplicateUsername(spec.username.clone()));
            }
            repo::insert_root(conn, &spec, balance, i64::from(hours) * 3600)?;
            repo::find_live(conn, &spec.username)?
                .ok_or_else(|| AgentError::NotFound(spec.username.clone()))
        });
        let created = logged(created, "create_root", tenant)?;
        info!(tenant, root = %created.username, "created root agent");
        Ok(created)
    }

    /// Enables or disables each listed descendant of `actor`.
    ///
    /// The card-usability flag follows the status. Each username is handled
    /// in its own transaction; a failure only marks that entry `false`.
    ///
    /// # Errors
    ///
    /// Only for failures that affect the whole batch: store resolution,
    /// [`AgentError::ActorNotFound`], [`AgentError::PermissionDenied`].
    pub fn set_enabled<S: AsRef<str>>(
        &self,
        tenant: &str,
        actor: &str,
        usernames: &[S],
        enabled: bool,
    ) -> Result<BTreeMap<String, bool>, AgentError> {
        let store = self.store(tenant)?;
        let actor_row = logged(
            store.read(|conn| require_actor(conn, actor)),
            "set_enabled",
            tenant,
        )?;
        logged(
            AccessDenied::check("set_enabled", Authority::MANAGE_AGENT, actor_row.authority)
                .map_err(AgentError::from),
            "set_enabled",
            tenant,
        )?;

        let mut results = BTreeMap::new();
        for username in usernames {
            let username = username.as_ref();
            let outcome = store.write(|conn| {
                let target = repo::find_live(conn, username)?
                    .ok_or_else(|| AgentError::TargetNotFound(username.into()))?;
                require_descendant(actor, &target)?;
                repo::set_enabled(conn, target.id, enabled)
            });
            match outcome {
                Ok(()) => {
                    info!(tenant, actor, target = username, enabled, "updated agent status");
                    results.insert(username.to_string(), true);
                }
                Err(e) => {
                    warn!(tenant, actor, target = username, code = e.code(), "status update skipped: {e}");
                    results.insert(username.to_string(), false);
                }
            }
        }
        Ok(results)
    }

    /// Replaces the remark of `target`, which is the actor itself or one of
    /// its descendants.
    ///
    /// # Errors
    ///
    /// [`AgentError::ActorNotFound`], [`AgentError::NotFound`],
    /// [`AgentError::NotDescendant`].
    pub fn update_remark(
        &self,
        tenant: &str,
        actor: &str,
        target: &str,
        remark: &str,
    ) -> Result<(), AgentError> {
        let store = self.store(tenant)?;
        let updated = store.write(|conn| {
            require_actor(conn, actor)?;
            let target_row = repo::find_live(conn, target)?
                .ok_or_else(|| AgentError::NotFound(target.into()))?;
            if target_row.username != actor {
                require_descendant(actor, &target_row)?;
            }
            repo::set_remark(conn, target_row.id, remark)
        });
        logged(updated, "update_remark", tenant)?;
        info!(tenant, actor, target, "updated remark");
        Ok(())
    }

    /// Soft-deletes a direct child of `actor` that has no live descendants.
    ///
    /// Balance, time and the row itself are kept.
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::ActorNotFound`], [`AgentError::PermissionDenied`],
    /// [`AgentError::NotFound`], [`AgentError::NotDirectChild`],
    /// [`AgentError::HasChildren`].
    pub fn delete_child(&self, tenant: &str, actor: &str, target: &str) -> Result<(), AgentError> {
        let store = self.store(tenant)?;
        let deleted = store.write(|conn| {
            let actor_row = require_actor(conn, actor)?;
            AccessDenied::check("delete_child", Authority::MANAGE_AGENT, actor_row.authority)?;
            let target_row = repo::find_live(conn, target)?
                .ok_or_else(|| AgentError::NotFound(target.into()))?;
            if !target_row.is_direct_child_of(actor) {
                return Err(AgentError::NotDirectChild {
                    actor: actor.into(),
                    target: target.into(),
                });
            }
            if repo::has_live_descendant(conn, target)? {
                return Err(AgentError::HasChildren(target.into()));
            }
            repo::mark_deleted(conn, target_row.id)
        });
        logged(deleted, "delete_child", tenant)?;
        info!(tenant, actor, target, "deleted agent");
        Ok(())
    }

    /// Overwrites a descendant's stored card-type grants.
    ///
    /// The set is stored as given. Narrowing to the viewer's own grants
    /// happens in [`authorized_grants_view`](Self::authorized_grants_view).
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::ActorNotFound`], [`AgentError::PermissionDenied`],
    /// [`AgentError::TargetNotFound`], [`AgentError::NotDescendant`].
    pub fn transfer_authorized_grants(
        &self,
        tenant: &str,
        actor: &str,
        target: &str,
        grants: &CardTypeGrants,
    ) -> Result<(), AgentError> {
        let store = self.store(tenant)?;
        let updated = store.write(|conn| {
            let target_row = require_managed_descendant(conn, "transfer_authorized_grants", actor, target)?;
            repo::set_grants(conn, target_row.id, grants)
        });
        logged(updated, "transfer_authorized_grants", tenant)?;
        info!(tenant, actor, target, grants = %grants, "replaced card type grants");
        Ok(())
    }

    /// Card types `target` may mint as seen by `viewer`.
    ///
    /// An empty viewer means self-view and returns the stored set. Otherwise
    /// the target must descend from the viewer and the result is the stored
    /// set intersected with the viewer's own grants, in the target's order.
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::TargetNotFound`], [`AgentError::NotDescendant`],
    /// [`AgentError::ActorNotFound`].
    pub fn authorized_grants_view(
        &self,
        tenant: &str,
        viewer: &str,
        target: &str,
    ) -> Result<CardTypeGrants, AgentError> {
        let store = self.store(tenant)?;
        let view = store.read(|conn| -> Result<CardTypeGrants, AgentError> {
            let target_row = repo::find_live(conn, target)?
                .ok_or_else(|| AgentError::TargetNotFound(target.into()))?;
            if viewer.is_empty() {
                return Ok(target_row.card_type_grants);
            }
            require_descendant(viewer, &target_row)?;
            let viewer_row = require_actor(conn, viewer)?;
            Ok(target_row
                .card_type_grants
                .intersect(&viewer_row.card_type_grants))
        });
        let view = logged(view, "authorized_grants_view", tenant)?;
        debug!(tenant, viewer, target, grants = %view, "resolved grant view");
        Ok(view)
    }

    /// Sets or clears authority bits on a descendant.
    ///
    /// An actor can only grant bits it holds itself. Returns the target's
    /// new authority.
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::ActorNotFound`], [`AgentError::PermissionDenied`],
    /// [`AgentError::TargetNotFound`], [`AgentError::NotDescendant`], then
    /// [`AgentError::PermissionDenied`] for bits the actor lacks.
    pub fn set_authority(
        &self,
        tenant: &str,
        actor: &str,
        target: &str,
        bits: Authority,
        enabled: bool,
    ) -> Result<Authority, AgentError> {
        let store = self.store(tenant)?;
        let updated = store.write(|conn| -> Result<Authority, AgentError> {
            let actor_row = require_actor(conn, actor)?;
            let target_row = require_managed_descendant(conn, "set_authority", actor, target)?;
            if enabled {
                AccessDenied::check("set_authority", bits, actor_row.authority)?;
            }
            let mask = Authority::set_permission(&target_row.authority.encode_mask(), bits, enabled)?;
            repo::set_authority(conn, target_row.id, &mask)?;
            Ok(Authority::decode_mask(&mask)?)
        });
        let authority = logged(updated, "set_authority", tenant)?;
        info!(tenant, actor, target, authority = %authority, "updated authority");
        Ok(authority)
    }
}

/// Loads the acting agent.
pub(crate) fn require_actor(conn: &Connection, actor: &str) -> Result<Agent, AgentError> {
    repo::find_live(conn, actor)?.ok_or_else(|| AgentError::ActorNotFound(actor.into()))
}

/// `target` must sit strictly below `actor`.
pub(crate) fn require_descendant(actor: &str, target: &Agent) -> Result<(), AgentError> {
    if target.is_descendant_of(actor) {
        Ok(())
    } else {
        Err(AgentError::NotDescendant {
            actor: actor.into(),
            target: target.username.clone(),
        })
    }
}

/// Actor lookup, MANAGE_AGENT check, target lookup and descent check, in
/// that order.
pub(crate) fn require_managed_descendant(
    conn: &Connection,
    operation: &str,
    actor: &str,
    target: &str,
) -> Result<Agent, AgentError> {
    let actor_row = require_actor(conn, actor)?;
    AccessDenied::check(operation, Authority::MANAGE_AGENT, actor_row.authority)?;
    let target_row = repo::find_live(conn, target)?
        .ok_or_else(|| AgentError::TargetNotFound(target.into()))?;
    require_descendant(actor, &target_row)?;
    Ok(target_row)
}

/// The agent's chain, or a root chain for rows stored without one.
fn lineage(agent: &Agent) -> AgentChain {
    if agent.chain.is_empty() {
        AgentChain::root(agent.username.as_str())
    } else {
        agent.chain.clone()
    }
}

/// Logs a failed operation at the level its kind calls for.
pub(crate) fn logged<T>(
    result: Result<T, AgentError>,
    operation: &str,
    tenant: &str,
) -> Result<T, AgentError> {
    if let Err(e) = &result {
        if matches!(e, AgentError::StoreUnavailable(_)) {
            error!(tenant, operation, code = e.code(), "store failure: {e}");
        } else {
            warn!(tenant, operation, code = e.code(), "rejected: {e}");
        }
    }
    result
}
