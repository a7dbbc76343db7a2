//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `billing` - In-memory billing store for tests and development
//! - `events` - Event bus implementations
//! - `http` - REST API exposure via Axum
//! - `postgres` - PostgreSQL-backed persistence

pub mod billing;
pub mod events;
pub mod http;
pub mod postgres;

pub use billing::MemoryBillingStore;
pub use events::InMemoryEventBus;
pub use postgres::PostgresBillingStore;
