//! Balance and time transfers down the tree.
//!
//! ```text
//! actor ──debit amount──────────────► target   credit amount × target.own_rate / 100
//! actor ──debit hours × 3600 s──────► target   credit hours × 3600 s
//! ```
//!
//! The whole operation is one `IMMEDIATE` transaction: preconditions are
//! checked against rows read inside it, both debits and both credits are
//! relative `UPDATE`s, and any failure rolls every write back.

use super::hierarchy::{logged, require_actor, require_descendant};
use super::{repo, AgentError};
use crate::store::StoreRegistry;
use agentree_auth::{AccessDenied, Authority};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Seconds credited per transferred hour.
pub const SECONDS_PER_HOUR: i64 = 3600;

/// What to move.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRequest {
    /// Balance debited from the actor. Must be non-negative.
    pub amount: f64,
    /// Whole hours of time stock.
    pub hours: u32,
}

impl TransferRequest {
    #[must_use]
    pub fn new(amount: f64, hours: u32) -> Self {
        Self { amount, hours }
    }

    #[must_use]
    pub fn balance(amount: f64) -> Self {
        Self::new(amount, 0)
    }

    #[must_use]
    pub fn time(hours: u32) -> Self {
        Self::new(0.0, hours)
    }

    /// Time amount in seconds.
    #[must_use]
    pub fn seconds(&self) -> i64 {
        i64::from(self.hours) * SECONDS_PER_HOUR
    }

    /// # Errors
    ///
    /// [`AgentError::InvalidRequest`] for a negative or non-finite amount,
    /// or when both amounts are zero.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AgentError::invalid(format!(
                "transfer amount {} must be a non-negative number",
                self.amount
            )));
        }
        if self.amount == 0.0 && self.hours == 0 {
            return Err(AgentError::invalid("nothing to transfer"));
        }
        Ok(())
    }
}

/// Result of a committed transfer, with both agents' values afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub actor: String,
    pub target: String,
    pub debited_balance: f64,
    pub credited_balance: f64,
    /// Seconds, debited and credited alike.
    pub transferred_time: i64,
    pub actor_balance: f64,
    pub actor_time_stock: i64,
    pub target_balance: f64,
    pub target_time_stock: i64,
}

/// Executes transfers against the tenant stores of one registry.
#[derive(Debug, Clone)]
pub struct TransferService {
    registry: Arc<StoreRegistry>,
}

impl TransferService {
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    /// Moves balance and/or time from `actor` to a strict descendant.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidRequest`] for a bad request, then in order:
    /// [`AgentError::ActorNotFound`], [`AgentError::PermissionDenied`],
    /// [`AgentError::TargetNotFound`], [`AgentError::NotDescendant`],
    /// [`AgentError::InsufficientBalance`], [`AgentError::InsufficientTime`].
    /// Nothing is written when any of these is returned.
    pub fn transfer(
        &self,
        tenant: &str,
        actor: &str,
        target: &str,
        request: TransferRequest,
    ) -> Result<TransferReceipt, AgentError> {
        request.validate()?;
        let store = self.registry.get_store(tenant)?;

        let receipt = store.write(|conn| {
            let source = require_actor(conn, actor)?;
            AccessDenied::check("transfer", Authority::MANAGE_AGENT, source.authority)?;
            let dest = repo::find_live(conn, target)?
                .ok_or_else(|| AgentError::TargetNotFound(target.into()))?;
            require_descendant(actor, &dest)?;

            if request.amount > 0.0 && source.balance < request.amount {
                return Err(AgentError::InsufficientBalance {
                    available: source.balance,
                    requested: request.amount,
                });
            }
            let seconds = request.seconds();
            if seconds > 0 && source.time_stock < seconds {
                return Err(AgentError::InsufficientTime {
                    available: source.time_stock,
                    requested: seconds,
                });
            }

            let credited = request.amount * (dest.own_rate / 100.0);
            repo::adjust_funds(conn, source.id, -request.amount, -seconds)?;
            repo::adjust_funds(conn, dest.id, credited, seconds)?;

            let source_after = require_actor(conn, actor)?;
            let dest_after = repo::find_live(conn, target)?
                .ok_or_else(|| AgentError::TargetNotFound(target.into()))?;
            Ok(TransferReceipt {
                actor: source_after.username,
                target: dest_after.username,
                debited_balance: request.amount,
                credited_balance: credited,
                transferred_time: seconds,
                actor_balance: source_after.balance,
                actor_time_stock: source_after.time_stock,
                target_balance: dest_after.balance,
                target_time_stock: dest_after.time_stock,
            })
        });
        let receipt = logged(receipt, "transfer", tenant)?;

        info!(
            tenant,
            actor,
            target,
            amount = receipt.debited_balance,
            credited = receipt.credited_balance,
            seconds = receipt.transferred_time,
            "transfer committed"
        );
        Ok(receipt)
    }
}
