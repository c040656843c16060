//! Subcommands.
//!
//! Each subcommand maps onto one runtime service call and prints its
//! [`Outcome`] as a single JSON line.

use agentree_auth::{Authority, CardTypeGrants};
use agentree_runtime::agent::{
    AgentError, DescendantQuery, DescendantScope, HierarchyService, MatchMode, NewAgent,
    TransferRequest, TransferService,
};
use agentree_runtime::pricing::{CardType, PricingService};
use agentree_runtime::session::ActorSession;
use agentree_runtime::store::StoreRegistry;
use agentree_runtime::Outcome;
use agentree_types::ErrorCode;
use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the tenant store, register it and seed its root agent
    Init {
        #[arg(long)]
        root: String,
        #[arg(long)]
        password: String,
        /// Opening balance of the root agent
        #[arg(long, default_value_t = 0.0)]
        balance: f64,
        /// Opening time stock of the root agent, in hours
        #[arg(long, default_value_t = 0)]
        hours: u32,
        /// Card types the root may mint (comma separated)
        #[arg(long, value_delimiter = ',')]
        grants: Vec<String>,
    },

    /// Show the tenant catalog
    Tenants,

    /// Sign in and show the matching account in every enabled tenant
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Create a direct child of the acting agent
    Create {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Authority names (comma separated, e.g. manage-agent,generate-card)
        #[arg(long, value_delimiter = ',')]
        authority: Vec<String>,
        /// Card types (comma separated)
        #[arg(long, value_delimiter = ',')]
        grants: Vec<String>,
        /// Own rate in percent
        #[arg(long, default_value_t = 100.0)]
        rate: f64,
        /// Expiry as unix seconds, 0 for never
        #[arg(long, default_value_t = 0)]
        expires: i64,
        #[arg(long, default_value = "")]
        remark: String,
    },

    /// List descendants of the acting agent
    List {
        #[arg(long)]
        actor: String,
        /// Include every transitive descendant
        #[arg(long, conflicts_with = "visible")]
        all: bool,
        /// Pick the scope from the actor's VIEW_ALL_DESCENDANTS bit
        #[arg(long)]
        visible: bool,
        #[arg(long)]
        keyword: Option<String>,
        /// Match the keyword as a substring
        #[arg(long, requires = "keyword")]
        fuzzy: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page size, 0 for everything
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// Move balance and/or time to a descendant
    Transfer {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value_t = 0.0)]
        amount: f64,
        #[arg(long, default_value_t = 0)]
        hours: u32,
    },

    /// Enable descendants
    Enable {
        #[arg(long)]
        actor: String,
        #[arg(required = true)]
        usernames: Vec<String>,
    },

    /// Disable descendants
    Disable {
        #[arg(long)]
        actor: String,
        #[arg(required = true)]
        usernames: Vec<String>,
    },

    /// Soft-delete a direct child without sub-agents
    Delete {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
    },

    /// Show the card types an agent may mint, as seen by a viewer
    Grants {
        #[arg(long)]
        target: String,
        /// Viewing ancestor; omit for the agent's own view
        #[arg(long, default_value = "")]
        viewer: String,
    },

    /// Replace a descendant's card-type grants
    SetGrants {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
        grants: Vec<String>,
    },

    /// Set or clear authority bits on a descendant
    Authority {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
        /// Authority names (comma separated)
        #[arg(required = true, value_delimiter = ',')]
        bits: Vec<String>,
        /// Clear the bits instead of setting them
        #[arg(long)]
        revoke: bool,
    },

    /// Replace the remark of the actor or a descendant
    Remark {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
        remark: String,
    },

    /// Show card prices for an agent
    Price {
        #[arg(long)]
        agent: String,
        /// Quote a single card type instead of listing all granted ones
        #[arg(long)]
        card_type: Option<String>,
    },

    /// Define or replace a card type
    CardType {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = 0)]
        duration: i64,
        #[arg(long, default_value = "")]
        remark: String,
    },
}

/// Services bound to one registry and tenant.
pub struct Context {
    registry: Arc<StoreRegistry>,
    tenant: String,
    hierarchy: HierarchyService,
    transfers: TransferService,
    pricing: PricingService,
}

impl Context {
    pub fn new(registry: Arc<StoreRegistry>, tenant: String) -> Self {
        Self {
            hierarchy: HierarchyService::new(Arc::clone(&registry)),
            transfers: TransferService::new(Arc::clone(&registry)),
            pricing: PricingService::new(Arc::clone(&registry)),
            registry,
            tenant,
        }
    }
}

#[derive(Serialize)]
struct LoginView<'a> {
    username: &'a str,
    accounts: BTreeMap<&'a str, &'a agentree_runtime::agent::Agent>,
}

/// Runs `command` and prints its outcome. Returns whether it succeeded.
///
/// # Errors
///
/// Only when the outcome cannot be written to stdout.
pub fn execute(command: Command, ctx: &Context) -> Result<bool> {
    let tenant = ctx.tenant.as_str();
    match command {
        Command::Init {
            root,
            password,
            balance,
            hours,
            grants,
        } => {
            let spec = NewAgent::new(root, password)
                .with_authority(Authority::ALL)
                .with_grants(grants);
            emit(init(ctx, spec, balance, hours))
        }

        Command::Tenants => emit(ctx.registry.list_tenants()),

        Command::Login { username, password } => {
            match ActorSession::establish(&ctx.registry, &username, &password) {
                Ok(session) => emit(Ok::<_, AgentError>(LoginView {
                    username: session.username(),
                    accounts: session
                        .tenants()
                        .filter_map(|t| session.agent(t.as_str()).map(|a| (t.as_str(), a)))
                        .collect(),
                })),
                Err(e) => emit(Err::<(), _>(e)),
            }
        }

        Command::Create {
            actor,
            username,
            password,
            authority,
            grants,
            rate,
            expires,
            remark,
        } => {
            let result = parse_authority(&authority).and_then(|authority| {
                let spec = NewAgent::new(username, password)
                    .with_authority(authority)
                    .with_grants(grants)
                    .with_own_rate(rate)
                    .with_expiry(expires)
                    .with_remark(remark);
                ctx.hierarchy.create_child(tenant, &actor, spec)
            });
            emit(result)
        }

        Command::List {
            actor,
            all,
            visible,
            keyword,
            fuzzy,
            page,
            limit,
        } => {
            let scope = if all {
                DescendantScope::All
            } else {
                DescendantScope::Direct
            };
            let mode = if fuzzy { MatchMode::Fuzzy } else { MatchMode::Exact };
            let query = DescendantQuery::new(scope)
                .with_keyword(keyword.unwrap_or_default(), mode)
                .with_page(page, limit);
            if visible {
                emit(ctx.hierarchy.visible_descendants(tenant, &actor, query))
            } else {
                emit(ctx.hierarchy.search_descendants(tenant, &actor, &query))
            }
        }

        Command::Transfer {
            actor,
            target,
            amount,
            hours,
        } => emit(ctx.transfers.transfer(
            tenant,
            &actor,
            &target,
            TransferRequest::new(amount, hours),
        )),

        Command::Enable { actor, usernames } => {
            emit(ctx.hierarchy.set_enabled(tenant, &actor, &usernames, true))
        }

        Command::Disable { actor, usernames } => {
            emit(ctx.hierarchy.set_enabled(tenant, &actor, &usernames, false))
        }

        Command::Delete { actor, target } => {
            emit(ctx.hierarchy.delete_child(tenant, &actor, &target))
        }

        Command::Grants { target, viewer } => {
            emit(ctx.hierarchy.authorized_grants_view(tenant, &viewer, &target))
        }

        Command::SetGrants {
            actor,
            target,
            grants,
        } => {
            let grants: CardTypeGrants = grants.into_iter().collect();
            emit(
                ctx.hierarchy
                    .transfer_authorized_grants(tenant, &actor, &target, &grants)
                    .map(|()| grants),
            )
        }

        Command::Authority {
            actor,
            target,
            bits,
            revoke,
        } => emit(parse_authority(&bits).and_then(|bits| {
            ctx.hierarchy
                .set_authority(tenant, &actor, &target, bits, !revoke)
        })),

        Command::Remark {
            actor,
            target,
            remark,
        } => emit(ctx.hierarchy.update_remark(tenant, &actor, &target, &remark)),

        Command::Price { agent, card_type } => match card_type {
            Some(card_type) => emit(ctx.pricing.quote(tenant, &agent, &card_type)),
            None => emit(ctx.pricing.priced_card_types(tenant, &agent)),
        },

        Command::CardType {
            name,
            price,
            prefix,
            duration,
            remark,
        } => {
            let card = CardType {
                name,
                prefix,
                duration,
                price,
                remark,
            };
            emit(ctx.pricing.define_card_type(tenant, &card).map(|()| card))
        }
    }
}

/// Provisions the tenant (and the catalog store), registers it and seeds the root.
fn init(
    ctx: &Context,
    root: NewAgent,
    balance: f64,
    hours: u32,
) -> Result<agentree_runtime::agent::Agent, AgentError> {
    // The default store holds the tenant catalog.
    ctx.registry
        .provision(ctx.registry.default_tenant().as_str())?;
    ctx.registry.provision(&ctx.tenant)?;
    ctx.registry.register_tenant(&ctx.tenant, true)?;
    let agent = ctx.hierarchy.create_root(&ctx.tenant, root, balance, hours)?;
    info!(tenant = %ctx.tenant, root = %agent.username, "Initialized tenant");
    Ok(agent)
}

/// Combines authority names; unknown names are an invalid request.
fn parse_authority(names: &[String]) -> Result<Authority, AgentError> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let (authority, unknown) = Authority::parse_list(&names);
    if unknown.is_empty() {
        Ok(authority)
    } else {
        Err(AgentError::invalid(format!(
            "unknown authority: {}",
            unknown.join(", ")
        )))
    }
}

fn emit<T: Serialize, E: ErrorCode + Display>(result: Result<T, E>) -> Result<bool> {
    let outcome = Outcome::from(result);
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(outcome.success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_names_combine() {
        let parsed = parse_authority(&["manage-agent".into(), "GENERATE_CARD".into()])
            .expect("known names");
        assert_eq!(parsed, Authority::MANAGE_AGENT | Authority::GENERATE_CARD);
        assert!(parse_authority(&[]).expect("empty").is_empty());
    }

    #[test]
    fn unknown_authority_is_rejected() {
        let err = parse_authority(&["manage-agent".into(), "fly".into()]).unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(msg) if msg.contains("fly")));
    }
}
