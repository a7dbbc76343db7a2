//! Route configuration for billing endpoints.
//!
//! Configures Axum router with billing-related routes.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    gateway_callback, get_plan_info, initiate_payment, record_usage, BillingAppState,
};

/// Creates the billing router with all endpoints.
///
/// Routes:
/// - `POST /api/billing/gateway/callback` - Payment gateway result notification
/// - `POST /api/billing/payments` - Start a plan purchase
/// - `GET /api/billing/plan` - Current plan standing for the user
/// - `POST /api/billing/usage` - Charge sent emails to the current grant
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/api/billing/gateway/callback", post(gateway_callback))
        .route("/api/billing/payments", post(initiate_payment))
        .route("/api/billing/plan", get(get_plan_info))
        .route("/api/billing/usage", post(record_usage))
}
