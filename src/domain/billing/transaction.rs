//! Transaction aggregate entity.
//!
//! A Transaction records one attempted payment. It is created Pending when a
//! payment is initiated, mutated only by the reconciliation flow, and never
//! deleted.
//!
//! # Design Decisions
//!
//! - **Two identities**: the gateway-echoed `external_id` (unique, what
//!   notifications reference) and the internal `TransactionId`
//! - **Monotonic status**: transitions go through the state machine; there is
//!   no path back to Pending
//! - **Injected time**: callers pass the current `Timestamp` so reconciliation
//!   is deterministic under a test clock

use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, Timestamp, TransactionId, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::{Money, TransactionStatus};

/// Transaction aggregate - one attempted payment.
///
/// # Invariants
///
/// - `external_id` is unique across all transactions (enforced by the store)
/// - Status transitions follow the `TransactionStatus` state machine
/// - `amount` never changes after initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal identifier for this transaction.
    pub id: TransactionId,

    /// Gateway-facing payment reference, echoed back in notifications.
    pub external_id: String,

    /// User who initiated the payment.
    pub user_id: UserId,

    /// Plan being purchased.
    pub plan_id: PlanId,

    /// Amount and currency the user was charged.
    pub amount: Money,

    /// Current status in the payment lifecycle.
    pub status: TransactionStatus,

    /// When the transaction was created.
    pub created_at: Timestamp,

    /// When the transaction was last updated.
    pub updated_at: Timestamp,
}

impl Transaction {
    /// Creates a new Pending transaction for an initiated payment.
    ///
    /// # Errors
    ///
    /// Returns error if the external reference is empty or the amount is zero.
    pub fn initiate(
        id: TransactionId,
        external_id: impl Into<String>,
        user_id: UserId,
        plan_id: PlanId,
        amount: Money,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(ValidationError::empty_field("external_id"));
        }
        if amount.is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            id,
            external_id,
            user_id,
            plan_id,
            amount,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks the payment as completed.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(TransactionStatus::Completed)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the payment as failed.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn fail(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(TransactionStatus::Failed)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the payment as refunded.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn refund(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(TransactionStatus::Refunded)?;
        self.updated_at = now;
        Ok(())
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: TransactionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition transaction from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
