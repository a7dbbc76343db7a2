//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `BillingStore` - Transaction and plan grant persistence
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//!
//! ## Infrastructure Ports
//!
//! - `Clock` - Injectable time source for deterministic reconciliation

mod billing_store;
mod clock;
mod event_publisher;

pub use billing_store::{BillingStore, GrantEffect, TransitionUpdate};
pub use clock::{Clock, SystemClock};
pub use event_publisher::EventPublisher;
