//! Reconciler - Applies verified gateway notifications to transactions.
//!
//! This module is the write side of payment reconciliation: it takes an
//! authenticated notification, replays it against the transaction's stored
//! state, and produces the status change plus grant effect to persist.
//!
//! ## Design
//!
//! Reconciliation follows these steps:
//! 1. Reject notifications that failed signature verification
//! 2. Look up the transaction by the gateway's payment reference
//! 3. Skip replays (transaction already carries the reported status)
//! 4. Cross-check the reported amount against the stored charge
//! 5. Apply the status transition through the state machine
//! 6. Derive the grant effect (activate on completion, revoke on refund)
//! 7. Persist the transition and grant effect as one atomic unit
//!
//! ## Replay Handling
//!
//! Gateways redeliver notifications. A redelivery arrives with the status
//! the transaction already carries and reports `AlreadyProcessed` without
//! touching the store's write side, so redeliveries never double-grant.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, GrantId, TransactionId};
use crate::ports::{BillingStore, Clock, GrantEffect, TransitionUpdate};

use super::{BillingError, Money, PaymentNotification, PlanGrant, Transaction, TransactionStatus};

/// What reconciling one notification did, or why it did nothing.
///
/// Every expected condition is a variant here rather than an error:
/// callers branch on the outcome, and `Err` is reserved for infrastructure
/// failures worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The reported status was applied and persisted.
    Applied {
        /// Transaction carrying its new status.
        transaction: Transaction,
        /// Grant change persisted alongside the status.
        effect: GrantEffect,
    },

    /// The transaction already carries the reported status (redelivery).
    AlreadyProcessed { transaction_id: TransactionId },

    /// The notification failed signature verification.
    Unauthorized,

    /// No transaction carries the reported payment reference.
    UnknownTransaction,

    /// The reported amount does not match the stored charge.
    ///
    /// The transaction keeps its current status; nothing is persisted.
    AmountMismatch { expected: Money, reported: Money },

    /// The reported status is not reachable from the current one.
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
}

/// Domain service that reconciles gateway notifications with stored
/// transactions and the grants they control.
///
/// Holds no mutable state; all writes go through the store port so the
/// service can be shared freely across concurrent requests.
pub struct Reconciler {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
    entitlement_window_days: u32,
}

impl Reconciler {
    /// Creates a reconciler with the given entitlement window.
    ///
    /// `entitlement_window_days` is how long a grant created by a completed
    /// payment lasts, measured from the moment of reconciliation.
    pub fn new(
        store: Arc<dyn BillingStore>,
        clock: Arc<dyn Clock>,
        entitlement_window_days: u32,
    ) -> Self {
        Self {
            store,
            clock,
            entitlement_window_days,
        }
    }

    /// Reconcile one gateway notification against the stored transaction.
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileOutcome::Applied)` - Status change persisted
    /// - `Ok(other variant)` - Nothing persisted; the variant says why
    /// - `Err(_)` - Store failure; safe to retry since the method only
    ///   writes through one atomic `apply_transition` call
    pub async fn reconcile(
        &self,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome, BillingError> {
        // 1. Drop notifications that failed signature verification
        if !notification.verified {
            return Ok(ReconcileOutcome::Unauthorized);
        }

        // 2. Look up the transaction the gateway is reporting on
        let mut transaction = match self
            .store
            .find_transaction(&notification.external_id)
            .await?
        {
            Some(transaction) => transaction,
            None => return Ok(ReconcileOutcome::UnknownTransaction),
        };

        // 3. Replay check before anything else: a redelivery must be
        //    acknowledged even if other fields drifted
        if transaction.status == notification.status {
            return Ok(ReconcileOutcome::AlreadyProcessed {
                transaction_id: transaction.id,
            });
        }

        // 4. Amount integrity: numeric equality on amount, exact on currency
        if transaction.amount != notification.amount {
            return Ok(ReconcileOutcome::AmountMismatch {
                expected: transaction.amount.clone(),
                reported: notification.amount.clone(),
            });
        }

        // 5. Status transition through the state machine
        let previous_status = transaction.status;
        let now = self.clock.now();
        let transition = match notification.status {
            TransactionStatus::Completed => transaction.complete(now),
            TransactionStatus::Failed => transaction.fail(now),
            TransactionStatus::Refunded => transaction.refund(now),
            // Field extraction rejects "pending"; guard against manual construction
            TransactionStatus::Pending => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Notifications cannot return a transaction to pending",
            )),
        };
        if transition.is_err() {
            return Ok(ReconcileOutcome::InvalidTransition {
                from: previous_status,
                to: notification.status,
            });
        }

        // 6. Grant effect for the new status
        let effect = match transaction.status {
            TransactionStatus::Completed => {
                let previous = self.store.current_grant(&transaction.user_id).await?;
                let grant = PlanGrant::activate(
                    GrantId::new(),
                    transaction.user_id.clone(),
                    transaction.plan_id,
                    transaction.id,
                    now,
                    self.entitlement_window_days,
                );
                GrantEffect::Activate {
                    grant,
                    supersedes: previous.map(|superseded| superseded.id),
                }
            }
            TransactionStatus::Refunded => {
                match self.store.current_grant(&transaction.user_id).await? {
                    // Revoke only the entitlement this payment bought
                    Some(grant) if grant.was_created_by(&transaction.id) => {
                        GrantEffect::Deactivate { grant_id: grant.id }
                    }
                    _ => GrantEffect::None,
                }
            }
            _ => GrantEffect::None,
        };

        // 7. Persist the transition and grant effect as one atomic unit
        self.store
            .apply_transition(TransitionUpdate {
                transaction: transaction.clone(),
                effect: effect.clone(),
            })
            .await?;

        Ok(ReconcileOutcome::Applied {
            transaction,
            effect,
        })
    }
}
