//! Billing store adapters.
//!
//! Adapters implement the billing persistence port for different environments:
//!
//! - `MemoryBillingStore` - In-process store for tests and development
//!
//! The PostgreSQL implementation lives under `adapters::postgres`.

mod memory_store;

pub use memory_store::MemoryBillingStore;
