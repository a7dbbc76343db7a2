//! Event publishing port.
//!
//! Reconciliation announces what it did (payment settled, grant activated or
//! revoked) through this port after the state change has been persisted, so
//! downstream consumers never see an event for a write that rolled back.
//! The transport behind the port is an adapter concern.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing billing domain events.
///
/// Delivery is at-least-once: gateway redeliveries that lose the
/// first-writer race are acknowledged without publishing, but a crash
/// between persist and publish can still surface duplicates, so consumers
/// must deduplicate by event id.
///
/// # Example
///
/// ```ignore
/// let envelope = event.to_envelope();
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event envelope.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish a batch of envelopes in order.
    ///
    /// Reconciliation emits a payment event and its grant event as one
    /// batch after the status transition has been persisted. Adapters
    /// without transactional publishing deliver sequentially, best-effort.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
