//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::billing::{
    // Commands
    InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult,
    NotificationOutcome, ProcessNotificationCommand, ProcessNotificationHandler,
    RecordUsageCommand, RecordUsageHandler, RecordUsageResult,
    // Queries
    GetPlanInfoHandler, GetPlanInfoQuery, GetPlanInfoResult, PlanInfoView,
    // Shared infrastructure
    TransactionLocks,
};
