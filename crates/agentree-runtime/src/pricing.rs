//! Card-type pricing.
//!
//! A card type has one base price per tenant. What an agent pays is that
//! price scaled by the agent's effective rate, the product of own rates from
//! the tenant root down to the agent:
//!
//! ```text
//! root (100) ── reseller (own 80 → 80) ── sub (own 50 → 40)
//!
//! base price 10.00   root pays 10.00   reseller pays 8.00   sub pays 4.00
//! ```
//!
//! Prices are truncated to cents, never rounded up.

use crate::agent::{logged, require_actor, Agent, AgentError};
use crate::store::{StoreRegistry, TenantStore};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One row of the `CardType` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardType {
    pub name: String,
    /// Prefix of generated card keys.
    pub prefix: String,
    /// Validity of a card of this type, as stored.
    pub duration: i64,
    /// Base price at effective rate 100.
    pub price: f64,
    pub remark: String,
}

impl CardType {
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            duration: 0,
            price,
            remark: String::new(),
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Price for an agent with `effective_rate` percent, truncated to cents.
    ///
    /// A non-positive base price is always free.
    ///
    /// ```
    /// use agentree_runtime::pricing::CardType;
    ///
    /// let week = CardType::new("week", 9.99);
    /// assert_eq!(week.price_for(50.0), 4.99);
    /// ```
    #[must_use]
    pub fn price_for(&self, effective_rate: f64) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        let scaled = self.price * (effective_rate / 100.0);
        (scaled * 100.0).trunc() / 100.0
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            prefix: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            duration: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
            price: row.get::<_, Option<f64>>(3)?.unwrap_or_default(),
            remark: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}

/// A card type with the price a specific agent pays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedCardType {
    #[serde(flatten)]
    pub card_type: CardType,
    /// Price after the agent's effective rate.
    pub agent_price: f64,
}

/// Price of one card type for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub agent: String,
    pub card_type: String,
    pub base_price: f64,
    pub effective_rate: f64,
    pub price: f64,
}

/// Reads card types and derives agent prices.
#[derive(Debug, Clone)]
pub struct PricingService {
    registry: Arc<StoreRegistry>,
}

impl PricingService {
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    fn store(&self, tenant: &str) -> Result<TenantStore, AgentError> {
        Ok(self.registry.get_store(tenant)?)
    }

    /// Every card type of the tenant, by name.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub fn card_types(&self, tenant: &str) -> Result<Vec<CardType>, AgentError> {
        let store = self.store(tenant)?;
        logged(store.read(load_all), "card_types", tenant)
    }

    /// Card types `agent` is granted, in grant order, each priced at the
    /// agent's effective rate. Grants naming a missing type are skipped.
    ///
    /// # Errors
    ///
    /// [`AgentError::ActorNotFound`] if the agent is missing or deleted.
    pub fn priced_card_types(
        &self,
        tenant: &str,
        agent: &str,
    ) -> Result<Vec<PricedCardType>, AgentError> {
        let store = self.store(tenant)?;
        let priced = store.read(|conn| -> Result<Vec<PricedCardType>, AgentError> {
            let agent_row = require_actor(conn, agent)?;
            let mut priced = Vec::with_capacity(agent_row.card_type_grants.len());
            for name in agent_row.card_type_grants.iter() {
                if let Some(card_type) = load_one(conn, name)? {
                    priced.push(PricedCardType {
                        agent_price: card_type.price_for(agent_row.effective_rate),
                        card_type,
                    });
                }
            }
            Ok(priced)
        });
        let priced = logged(priced, "priced_card_types", tenant)?;
        debug!(tenant, agent, count = priced.len(), "priced card types");
        Ok(priced)
    }

    /// Price `agent` pays for one card of `card_type`.
    ///
    /// # Errors
    ///
    /// In order: [`AgentError::ActorNotFound`],
    /// [`AgentError::CardTypeNotGranted`], [`AgentError::CardTypeNotFound`].
    pub fn quote(&self, tenant: &str, agent: &str, card_type: &str) -> Result<Quote, AgentError> {
        let store = self.store(tenant)?;
        let quote = store.read(|conn| -> Result<Quote, AgentError> {
            let agent_row = require_actor(conn, agent)?;
            require_grant(&agent_row, card_type)?;
            let card = load_one(conn, card_type)?
                .ok_or_else(|| AgentError::CardTypeNotFound(card_type.into()))?;
            Ok(Quote {
                agent: agent_row.username,
                card_type: card.name.clone(),
                base_price: card.price,
                effective_rate: agent_row.effective_rate,
                price: card.price_for(agent_row.effective_rate),
            })
        });
        let quote = logged(quote, "quote", tenant)?;
        debug!(tenant, agent, card_type, price = quote.price, "quoted");
        Ok(quote)
    }

    /// Inserts or replaces a card type.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidRequest`] for a blank name or a negative or
    /// non-finite price; store failures otherwise.
    pub fn define_card_type(&self, tenant: &str, card_type: &CardType) -> Result<(), AgentError> {
        if card_type.name.trim().is_empty() {
            return Err(AgentError::invalid("card type name must not be empty"));
        }
        if !card_type.price.is_finite() || card_type.price < 0.0 {
            return Err(AgentError::invalid(format!(
                "card type price {} must be a non-negative number",
                card_type.price
            )));
        }
        let store = self.store(tenant)?;
        let written = store.write(|conn| -> Result<(), AgentError> {
            conn.execute(
                "INSERT INTO CardType (Name, Prefix, Duration, Price, Remarks) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(Name) DO UPDATE SET Prefix = excluded.Prefix, \
                 Duration = excluded.Duration, Price = excluded.Price, Remarks = excluded.Remarks",
                params![
                    card_type.name,
                    card_type.prefix,
                    card_type.duration,
                    card_type.price,
                    card_type.remark
                ],
            )?;
            Ok(())
        });
        logged(written, "define_card_type", tenant)?;
        info!(tenant, card_type = %card_type.name, price = card_type.price, "defined card type");
        Ok(())
    }
}

fn require_grant(agent: &Agent, card_type: &str) -> Result<(), AgentError> {
    if agent.can_issue(card_type) {
        Ok(())
    } else {
        Err(AgentError::CardTypeNotGranted {
            agent: agent.username.clone(),
            card_type: card_type.into(),
        })
    }
}

fn load_all(conn: &Connection) -> Result<Vec<CardType>, AgentError> {
    let mut stmt =
        conn.prepare("SELECT Name, Prefix, Duration, Price, Remarks FROM CardType ORDER BY Name")?;
    let rows = stmt.query_map([], CardType::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_one(conn: &Connection, name: &str) -> Result<Option<CardType>, AgentError> {
    Ok(conn
        .query_row(
            "SELECT Name, Prefix, Duration, Price, Remarks FROM CardType WHERE Name = ?1",
            [name],
            CardType::from_row,
        )
        .optional()?)
}
