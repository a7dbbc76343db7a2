//! Billing domain module.
//!
//! Handles paid plans, payment transactions, gateway notification
//! verification, and the entitlement grants payments create.
//!
//! # Module Structure
//!
//! - `transaction` - Transaction aggregate entity
//! - `status` - TransactionStatus state machine
//! - `grant` - PlanGrant entitlement entity
//! - `plan` - Plan catalog entries and quotas
//! - `money` - Monetary value objects with numeric equality
//! - `notification` - Typed extraction of gateway notification fields
//! - `signature` - HMAC verification of notification payloads
//! - `reconciler` - Applies verified notifications to transactions
//! - `events` - Domain events emitted by the billing lifecycle
//! - `errors` - Billing operation errors

mod errors;
mod events;
mod grant;
mod money;
mod notification;
mod plan;
mod reconciler;
mod signature;
mod status;
mod transaction;

pub use errors::BillingError;
pub use events::BillingEvent;
pub use grant::PlanGrant;
pub use money::{CurrencyCode, Money};
pub use notification::{
    PaymentNotification, FIELD_AMOUNT, FIELD_CURRENCY, FIELD_PAYMENT_ID, FIELD_STATUS,
};
pub use plan::{Plan, PlanType};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use signature::{payload_digest, NotificationVerifier, SIGNATURE_FIELD};
pub use status::TransactionStatus;
pub use transaction::Transaction;

#[cfg(test)]
pub use notification::NotificationFieldsBuilder;
#[cfg(test)]
pub use signature::compute_test_signature;
