//! Billing handlers.
//!
//! Command and query handlers for the payment lifecycle including:
//!
//! ## Commands
//! - Initiating plan purchases
//! - Processing gateway payment notifications
//! - Recording email usage against grants
//!
//! ## Queries
//! - Get a user's current plan standing

mod get_plan_info;
mod initiate_payment;
mod process_notification;
mod record_usage;
mod transaction_locks;

// Commands
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult};
pub use process_notification::{
    NotificationOutcome, ProcessNotificationCommand, ProcessNotificationHandler,
};
pub use record_usage::{RecordUsageCommand, RecordUsageHandler, RecordUsageResult};

// Queries
pub use get_plan_info::{GetPlanInfoHandler, GetPlanInfoQuery, GetPlanInfoResult, PlanInfoView};

// Shared infrastructure
pub use transaction_locks::TransactionLocks;
