//! HTTP adapter for the billing module.
//!
//! This module exposes billing operations via REST endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/billing/gateway/callback` - Payment gateway result notification
//! - `POST /api/billing/payments` - Start a plan purchase
//! - `GET /api/billing/plan` - Current plan standing for the user
//! - `POST /api/billing/usage` - Charge sent emails to the current grant
//!
//! The gateway callback is unauthenticated at the HTTP layer; the payload
//! signature is the credential. User-facing endpoints read the identity the
//! fronting proxy forwards in `X-User-Id`.

pub mod dto;
pub mod handlers;
pub mod routes;

// Re-export commonly used types
pub use handlers::BillingAppState;
pub use routes::billing_router;
