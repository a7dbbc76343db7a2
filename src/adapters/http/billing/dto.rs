//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the request/response structure for the billing API.
//! They serve as the boundary between HTTP and the application layer.
//!
//! The gateway callback is deliberately absent here: its request body is the
//! raw form-field map (signature included) and its success response is the
//! plain-text acknowledgment the gateway expects, not JSON.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    InitiatePaymentResult, PlanInfoView, RecordUsageResult,
};
use crate::domain::billing::{PlanType, TransactionStatus};

/// Body the gateway treats as delivery confirmation.
pub const GATEWAY_ACK: &str = "OK";

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a plan purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Catalog ID of the plan to buy.
    pub plan_id: String,
}

/// Request to charge sent emails against the current grant.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordUsageRequest {
    /// Number of emails sent.
    pub emails: u32,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for the current plan standing.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfoResponse {
    /// The plan standing, or empty if the user never purchased a plan.
    #[serde(flatten)]
    pub plan: Option<PlanStandingResponse>,
}

/// Detailed plan standing for API response.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStandingResponse {
    /// Plan name from the catalog.
    pub plan_name: String,
    /// Dimension the plan is metered on.
    pub plan_type: PlanType,
    /// Emails left in the current entitlement window.
    pub emails_remaining: i64,
    /// Maximum subscribers the plan allows.
    pub subscriber_limit: i64,
    /// Whether sending is unmetered on this plan.
    pub unmetered_sending: bool,
    /// When the entitlement expires (ISO 8601).
    pub expires_at: String,
    /// Whether the entitlement window has already ended.
    pub is_expired: bool,
}

impl From<PlanInfoView> for PlanStandingResponse {
    fn from(view: PlanInfoView) -> Self {
        Self {
            plan_name: view.plan_name,
            plan_type: view.plan_type,
            emails_remaining: view.emails_remaining,
            subscriber_limit: view.subscriber_limit,
            unmetered_sending: view.unmetered_sending,
            expires_at: view.expires_at.as_datetime().to_rfc3339(),
            is_expired: view.is_expired,
        }
    }
}

/// Response for payment initiation.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentResponse {
    /// Internal transaction ID.
    pub transaction_id: String,
    /// Payment reference the gateway will report back.
    pub external_id: String,
    /// Charge amount as a decimal string.
    pub amount: String,
    /// Charge currency (ISO 4217).
    pub currency: String,
    /// Transaction status (always pending at initiation).
    pub status: TransactionStatus,
}

impl From<InitiatePaymentResult> for InitiatePaymentResponse {
    fn from(result: InitiatePaymentResult) -> Self {
        let transaction = result.transaction;
        Self {
            transaction_id: transaction.id.to_string(),
            external_id: transaction.external_id.clone(),
            amount: transaction.amount.amount().to_string(),
            currency: transaction.amount.currency().as_str().to_string(),
            status: transaction.status,
        }
    }
}

/// Response for usage recording.
#[derive(Debug, Clone, Serialize)]
pub struct RecordUsageResponse {
    /// Total emails charged to the grant so far.
    pub emails_sent: i64,
}

impl From<RecordUsageResult> for RecordUsageResponse {
    fn from(result: RecordUsageResult) -> Self {
        Self {
            emails_sent: result.emails_sent,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
