//! Billing-specific error types.
//!
//! Errors related to payment reconciliation, plan grants, and usage tracking.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PlanNotFound | 404 |
//! | NoActiveGrant | 402 |
//! | DuplicateExternalId | 409 |
//! | InvalidState | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 503 |

use crate::domain::foundation::{DomainError, ErrorCode, PlanId, UserId, ValidationError};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Plan was not found in the catalog.
    PlanNotFound(PlanId),

    /// User has no active plan grant.
    NoActiveGrant(UserId),

    /// A transaction with this external reference already exists.
    DuplicateExternalId(String),

    /// Invalid state for the requested operation.
    InvalidState {
        current: String,
        attempted: String,
    },

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    // Constructor functions for cleaner error creation

    pub fn plan_not_found(id: PlanId) -> Self {
        BillingError::PlanNotFound(id)
    }

    pub fn no_active_grant(user_id: UserId) -> Self {
        BillingError::NoActiveGrant(user_id)
    }

    pub fn duplicate_external_id(external_id: impl Into<String>) -> Self {
        BillingError::DuplicateExternalId(external_id.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::NoActiveGrant(_) => ErrorCode::NoActiveGrant,
            BillingError::DuplicateExternalId(_) => ErrorCode::DuplicateExternalId,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::PlanNotFound(id) => format!("Plan not found: {}", id),
            BillingError::NoActiveGrant(user_id) => {
                format!("User {} has no active plan grant", user_id)
            }
            BillingError::DuplicateExternalId(external_id) => {
                format!("A transaction with reference '{}' already exists", external_id)
            }
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} transaction in {} state", attempted, current)
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Infrastructure(_))
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.to_string(),
            },
            ErrorCode::DuplicateExternalId => {
                BillingError::DuplicateExternalId("unknown".to_string())
            }
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.to_string(),
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field } => field.clone(),
            ValidationError::OutOfRange { field, .. } => field.clone(),
            ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        BillingError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}
