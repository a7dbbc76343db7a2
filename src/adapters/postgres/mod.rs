//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresBillingStore` - Transactions, plan grants, and the plan catalog

mod billing_store;

pub use billing_store::PostgresBillingStore;
