//! Billing domain events.
//!
//! Events emitted during payment reconciliation and grant lifecycle changes.
//! These events are used for:
//! - Audit logging (all reconciliation outcomes that change state)
//! - Integration with other modules (entitlement changes)
//! - Email notifications (payment received, refund confirmed)
//!
//! Events are published only after the owning state change has been
//! persisted, so consumers may treat them as at-least-once facts.
//!
//! # Event Naming Convention
//!
//! Events are named in past tense to indicate something that has already happened:
//! - `PaymentCompleted` not `CompletePayment`
//! - `GrantRevoked` not `RevokeGrant`

use crate::domain::foundation::{
    DomainEvent, EventId, GrantId, PlanId, Timestamp, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

use super::Money;

/// Events that occur during payment reconciliation.
///
/// Each variant carries its own event id so that republishing after a
/// delivery failure stays deduplicatable downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingEvent {
    /// A payment was confirmed by the gateway.
    ///
    /// State transition: Pending → Completed
    ///
    /// Trigger: gateway callback reporting `completed`
    PaymentCompleted {
        event_id: EventId,
        transaction_id: TransactionId,
        user_id: UserId,
        plan_id: PlanId,
        amount: Money,
        occurred_at: Timestamp,
    },

    /// A payment was rejected or abandoned at the gateway.
    ///
    /// State transition: Pending → Failed
    ///
    /// Trigger: gateway callback reporting `failed`
    PaymentFailed {
        event_id: EventId,
        transaction_id: TransactionId,
        user_id: UserId,
        occurred_at: Timestamp,
    },

    /// A payment was returned to the customer.
    ///
    /// State transition: Pending → Refunded or Completed → Refunded
    ///
    /// Trigger: gateway callback reporting `refunded`
    PaymentRefunded {
        event_id: EventId,
        transaction_id: TransactionId,
        user_id: UserId,
        occurred_at: Timestamp,
    },

    /// A plan grant became the user's current entitlement.
    ///
    /// Trigger: successful reconciliation of a completed payment
    GrantActivated {
        event_id: EventId,
        grant_id: GrantId,
        user_id: UserId,
        plan_id: PlanId,
        transaction_id: TransactionId,
        expires_at: Timestamp,
        /// Grant that was superseded by this one, if the user had one.
        superseded_grant: Option<GrantId>,
        occurred_at: Timestamp,
    },

    /// A plan grant was withdrawn following a refund.
    ///
    /// Trigger: refund of the transaction that created the grant
    GrantRevoked {
        event_id: EventId,
        grant_id: GrantId,
        user_id: UserId,
        transaction_id: TransactionId,
        occurred_at: Timestamp,
    },
}

impl BillingEvent {
    /// Returns the user this event concerns.
    pub fn user_id(&self) -> &UserId {
        match self {
            BillingEvent::PaymentCompleted { user_id, .. }
            | BillingEvent::PaymentFailed { user_id, .. }
            | BillingEvent::PaymentRefunded { user_id, .. }
            | BillingEvent::GrantActivated { user_id, .. }
            | BillingEvent::GrantRevoked { user_id, .. } => user_id,
        }
    }

    /// Returns the transaction this event concerns.
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            BillingEvent::PaymentCompleted { transaction_id, .. }
            | BillingEvent::PaymentFailed { transaction_id, .. }
            | BillingEvent::PaymentRefunded { transaction_id, .. }
            | BillingEvent::GrantActivated { transaction_id, .. }
            | BillingEvent::GrantRevoked { transaction_id, .. } => *transaction_id,
        }
    }
}

impl DomainEvent for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::PaymentCompleted { .. } => "billing.payment.completed.v1",
            BillingEvent::PaymentFailed { .. } => "billing.payment.failed.v1",
            BillingEvent::PaymentRefunded { .. } => "billing.payment.refunded.v1",
            BillingEvent::GrantActivated { .. } => "billing.grant.activated.v1",
            BillingEvent::GrantRevoked { .. } => "billing.grant.revoked.v1",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> String {
        match self {
            BillingEvent::PaymentCompleted { transaction_id, .. }
            | BillingEvent::PaymentFailed { transaction_id, .. }
            | BillingEvent::PaymentRefunded { transaction_id, .. } => transaction_id.to_string(),
            BillingEvent::GrantActivated { grant_id, .. }
            | BillingEvent::GrantRevoked { grant_id, .. } => grant_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            BillingEvent::PaymentCompleted { .. }
            | BillingEvent::PaymentFailed { .. }
            | BillingEvent::PaymentRefunded { .. } => "Transaction",
            BillingEvent::GrantActivated { .. } | BillingEvent::GrantRevoked { .. } => "PlanGrant",
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            BillingEvent::PaymentCompleted { occurred_at, .. }
            | BillingEvent::PaymentFailed { occurred_at, .. }
            | BillingEvent::PaymentRefunded { occurred_at, .. }
            | BillingEvent::GrantActivated { occurred_at, .. }
            | BillingEvent::GrantRevoked { occurred_at, .. } => *occurred_at,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            BillingEvent::PaymentCompleted { event_id, .. }
            | BillingEvent::PaymentFailed { event_id, .. }
            | BillingEvent::PaymentRefunded { event_id, .. }
            | BillingEvent::GrantActivated { event_id, .. }
            | BillingEvent::GrantRevoked { event_id, .. } => event_id.clone(),
        }
    }
}
