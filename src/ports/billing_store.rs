//! Billing store port (write side).
//!
//! Defines the contract for persisting transactions, plan grants, and the
//! combined status-transition updates produced by reconciliation.
//! Implementations handle the actual database operations.
//!
//! # Design
//!
//! - **Write-focused**: Optimized for aggregate persistence
//! - **Atomic transitions**: `apply_transition` persists a status change and
//!   its grant effect as one unit or not at all
//! - **Unique constraint**: One transaction per gateway payment reference
//!
//! # Example
//!
//! ```ignore
//! async fn start_payment(
//!     store: &dyn BillingStore,
//!     user_id: &UserId,
//!     plan: &Plan,
//!     external_id: &str,
//! ) -> Result<Transaction, DomainError> {
//!     if store.find_transaction(external_id).await?.is_some() {
//!         return Err(DomainError::new(
//!             ErrorCode::DuplicateExternalId,
//!             "Payment reference already registered",
//!         ));
//!     }
//!
//!     let transaction = Transaction::initiate(
//!         TransactionId::new(),
//!         external_id.to_string(),
//!         user_id.clone(),
//!         plan.id,
//!         plan.price.clone(),
//!         Timestamp::now(),
//!     )?;
//!
//!     store.save_transaction(&transaction).await?;
//!     Ok(transaction)
//! }
//! ```

use crate::domain::billing::{Plan, PlanGrant, Transaction};
use crate::domain::foundation::{DomainError, GrantId, PlanId, UserId};
use async_trait::async_trait;

/// Grant-side consequence of a transaction status change.
///
/// Produced by reconciliation and persisted together with the transaction
/// row by [`BillingStore::apply_transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum GrantEffect {
    /// Status change touches no grant (e.g. a payment failure).
    None,
    /// Persist `grant` as the user's current entitlement. When `supersedes`
    /// is set, that earlier grant must be deactivated in the same unit.
    Activate {
        grant: PlanGrant,
        supersedes: Option<GrantId>,
    },
    /// Deactivate the grant this transaction created (refund path).
    Deactivate { grant_id: GrantId },
}

/// A transaction status change plus its grant effect, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionUpdate {
    /// Transaction carrying the already-applied new status.
    pub transaction: Transaction,
    /// What happens to the user's entitlement alongside the status change.
    pub effect: GrantEffect,
}

/// Store port for billing aggregate persistence.
///
/// Handles write operations for the payment and entitlement lifecycle.
/// Implementations must ensure:
/// - Unique external_id constraint on transactions
/// - `apply_transition` is all-or-nothing
/// - At most one active grant per user after any transition
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Find a transaction by the gateway's payment reference.
    ///
    /// Returns `None` if no transaction carries that reference.
    /// This is the primary lookup during reconciliation since gateway
    /// notifications identify payments by external reference only.
    async fn find_transaction(&self, external_id: &str)
        -> Result<Option<Transaction>, DomainError>;

    /// Save a newly initiated transaction.
    ///
    /// # Errors
    ///
    /// - `DuplicateExternalId` if the payment reference is already registered
    /// - `DatabaseError` on persistence failure
    async fn save_transaction(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Find the user's current active grant.
    ///
    /// Returns `None` if the user has no active grant. Expiry is a domain
    /// concern; this returns the active row regardless of its expiry date.
    async fn current_grant(&self, user_id: &UserId) -> Result<Option<PlanGrant>, DomainError>;

    /// Persist a grant, inserting or updating by grant ID.
    ///
    /// Used for usage counters and administrative corrections; reconciliation
    /// goes through `apply_transition` instead.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save_grant(&self, grant: &PlanGrant) -> Result<(), DomainError>;

    /// Apply a status transition and its grant effect as one atomic unit.
    ///
    /// Either the transaction row and every grant row named by the effect
    /// are all updated, or none are.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the transaction row has disappeared
    /// - `DatabaseError` on persistence failure
    async fn apply_transition(&self, update: TransitionUpdate) -> Result<(), DomainError>;

    /// Find a plan by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError>;
}
