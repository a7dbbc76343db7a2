//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `billing` - Plans, payment transactions, notification reconciliation, grants

pub mod billing;
pub mod foundation;
