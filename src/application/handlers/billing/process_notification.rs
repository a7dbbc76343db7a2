//! ProcessNotificationHandler - Command handler for gateway payment notifications.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::billing::{
    payload_digest, BillingError, BillingEvent, NotificationVerifier, PaymentNotification,
    ReconcileOutcome, Reconciler, Transaction, TransactionStatus, SIGNATURE_FIELD,
};
use crate::domain::foundation::{EventId, SerializableDomainEvent};
use crate::ports::{EventPublisher, GrantEffect};

use super::TransactionLocks;

/// Command to process one gateway notification.
#[derive(Debug, Clone)]
pub struct ProcessNotificationCommand {
    /// Form fields exactly as the gateway posted them, signature included.
    pub fields: HashMap<String, String>,
}

/// Result of notification processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Status change applied and persisted.
    Applied { new_status: TransactionStatus },
    /// Redelivery of a notification that was already applied.
    AlreadyProcessed,
    /// Signature verification failed.
    Unauthorized,
    /// No transaction carries the reported payment reference.
    UnknownTransaction,
    /// Reported amount does not match the stored charge.
    AmountMismatch,
    /// Reported status is not reachable from the current one.
    InvalidTransition,
}

/// Handler for processing payment gateway notifications.
///
/// Verifies the signature, reconciles the notification against the stored
/// transaction under a per-payment lock, and publishes domain events for
/// applied transitions.
pub struct ProcessNotificationHandler {
    verifier: NotificationVerifier,
    reconciler: Reconciler,
    locks: Arc<TransactionLocks>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ProcessNotificationHandler {
    pub fn new(
        verifier: NotificationVerifier,
        reconciler: Reconciler,
        locks: Arc<TransactionLocks>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            verifier,
            reconciler,
            locks,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessNotificationCommand,
    ) -> Result<NotificationOutcome, BillingError> {
        // 1. Verify the signature before reading anything else from the
        //    payload; unauthenticated senders learn nothing about parsing
        let supplied_code = cmd
            .fields
            .get(SIGNATURE_FIELD)
            .map(String::as_str)
            .unwrap_or("");
        if !self.verifier.verify(&cmd.fields, supplied_code) {
            warn!(
                payload_digest = %payload_digest(&cmd.fields),
                "Rejected notification with missing or invalid signature"
            );
            return Ok(NotificationOutcome::Unauthorized);
        }

        // 2. Extract typed fields from the authenticated payload
        let notification = PaymentNotification::from_fields(&cmd.fields, true)?;

        // 3. Serialize processing per payment reference; concurrent
        //    redeliveries for the same payment wait here
        let _guard = self.locks.acquire(&notification.external_id).await;

        // 4. Reconcile against the stored transaction
        let outcome = self.reconciler.reconcile(&notification).await?;

        // 5. Publish events for applied transitions, then map the outcome
        match outcome {
            ReconcileOutcome::Applied {
                transaction,
                effect,
            } => {
                let events = applied_events(&transaction, &effect);
                let envelopes = events.iter().map(|e| e.to_envelope()).collect();
                self.event_publisher.publish_all(envelopes).await?;

                info!(
                    external_id = %transaction.external_id,
                    status = transaction.status.as_str(),
                    "Applied gateway notification"
                );
                Ok(NotificationOutcome::Applied {
                    new_status: transaction.status,
                })
            }
            ReconcileOutcome::AlreadyProcessed { transaction_id } => {
                debug!(
                    external_id = %notification.external_id,
                    transaction_id = %transaction_id,
                    "Acknowledged redelivered notification"
                );
                Ok(NotificationOutcome::AlreadyProcessed)
            }
            // Verification already passed; the reconciler re-checks for
            // callers that construct notifications directly
            ReconcileOutcome::Unauthorized => Ok(NotificationOutcome::Unauthorized),
            ReconcileOutcome::UnknownTransaction => {
                warn!(
                    external_id = %notification.external_id,
                    "Notification references no known transaction"
                );
                Ok(NotificationOutcome::UnknownTransaction)
            }
            ReconcileOutcome::AmountMismatch { expected, reported } => {
                warn!(
                    external_id = %notification.external_id,
                    expected = %expected,
                    reported = %reported,
                    "Notification amount does not match stored charge"
                );
                Ok(NotificationOutcome::AmountMismatch)
            }
            ReconcileOutcome::InvalidTransition { from, to } => {
                warn!(
                    external_id = %notification.external_id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "Notification requests an invalid status transition"
                );
                Ok(NotificationOutcome::InvalidTransition)
            }
        }
    }
}

/// Domain events describing an applied transition and its grant effect.
fn applied_events(transaction: &Transaction, effect: &GrantEffect) -> Vec<BillingEvent> {
    let occurred_at = transaction.updated_at;
    let mut events = Vec::new();

    match transaction.status {
        TransactionStatus::Completed => events.push(BillingEvent::PaymentCompleted {
            event_id: EventId::new(),
            transaction_id: transaction.id,
            user_id: transaction.user_id.clone(),
            plan_id: transaction.plan_id,
            amount: transaction.amount.clone(),
            occurred_at,
        }),
        TransactionStatus::Failed => events.push(BillingEvent::PaymentFailed {
            event_id: EventId::new(),
            transaction_id: transaction.id,
            user_id: transaction.user_id.clone(),
            occurred_at,
        }),
        TransactionStatus::Refunded => events.push(BillingEvent::PaymentRefunded {
            event_id: EventId::new(),
            transaction_id: transaction.id,
            user_id: transaction.user_id.clone(),
            occurred_at,
        }),
        TransactionStatus::Pending => {}
    }

    match effect {
        GrantEffect::None => {}
        GrantEffect::Activate { grant, supersedes } => events.push(BillingEvent::GrantActivated {
            event_id: EventId::new(),
            grant_id: grant.id,
            user_id: grant.user_id.clone(),
            plan_id: grant.plan_id,
            transaction_id: grant.transaction_id,
            expires_at: grant.expires_at,
            superseded_grant: *supersedes,
            occurred_at,
        }),
        GrantEffect::Deactivate { grant_id } => events.push(BillingEvent::GrantRevoked {
            event_id: EventId::new(),
            grant_id: *grant_id,
            user_id: transaction.user_id.clone(),
            transaction_id: transaction.id,
            occurred_at,
        }),
    }

    events
}
