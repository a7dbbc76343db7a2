//! Transaction status state machine.
//!
//! Defines all possible payment transaction states and valid transitions
//! according to the gateway reconciliation lifecycle.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Payment transaction status.
///
/// A transaction starts Pending and moves monotonically to a terminal state
/// driven by verified gateway notifications. Completed transactions can still
/// be refunded; Failed and Refunded are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Payment initiated, outcome not yet reported by the gateway.
    Pending,

    /// Gateway confirmed the payment. Entitlement granted.
    Completed,

    /// Gateway reported the payment as failed. No entitlement.
    Failed,

    /// Payment was refunded. Any entitlement it created is revoked.
    Refunded,
}

impl TransactionStatus {
    /// Returns the canonical lowercase string for this status.
    ///
    /// Used for database storage and wire comparisons.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// Parses a status from its canonical lowercase string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Completed)
                | (Pending, Failed)
                | (Pending, Refunded)
            // From COMPLETED
                | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Completed, Failed, Refunded],
            Completed => vec![Refunded],
            Failed => vec![],
            Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests - State Transitions

    #[test]
    fn pending_can_transition_to_completed() {
        let status = TransactionStatus::Pending;
        assert!(status.can_transition_to(&TransactionStatus::Completed));

        let result = status.transition_to(TransactionStatus::Completed);
        assert_eq!(result, Ok(TransactionStatus::Completed));
    }

    #[test]
    fn pending_can_transition_to_failed() {
        let status = TransactionStatus::Pending;
        assert!(status.can_transition_to(&TransactionStatus::Failed));

        let result = status.transition_to(TransactionStatus::Failed);
        assert_eq!(result, Ok(TransactionStatus::Failed));
    }

    #[test]
    fn pending_can_transition_to_refunded() {
        let status = TransactionStatus::Pending;
        assert!(status.can_transition_to(&TransactionStatus::Refunded));

        let result = status.transition_to(TransactionStatus::Refunded);
        assert_eq!(result, Ok(TransactionStatus::Refunded));
    }

    #[test]
    fn completed_can_transition_to_refunded() {
        let status = TransactionStatus::Completed;
        assert!(status.can_transition_to(&TransactionStatus::Refunded));

        let result = status.transition_to(TransactionStatus::Refunded);
        assert_eq!(result, Ok(TransactionStatus::Refunded));
    }

    #[test]
    fn completed_cannot_transition_to_failed() {
        let status = TransactionStatus::Completed;
        assert!(!status.can_transition_to(&TransactionStatus::Failed));

        let result = status.transition_to(TransactionStatus::Failed);
        assert!(result.is_err());
    }

    #[test]
    fn failed_cannot_transition_anywhere() {
        let status = TransactionStatus::Failed;
        assert!(!status.can_transition_to(&TransactionStatus::Completed));
        assert!(!status.can_transition_to(&TransactionStatus::Refunded));
        assert!(!status.can_transition_to(&TransactionStatus::Pending));
    }

    #[test]
    fn refunded_cannot_transition_anywhere() {
        let status = TransactionStatus::Refunded;
        assert!(!status.can_transition_to(&TransactionStatus::Completed));
        assert!(!status.can_transition_to(&TransactionStatus::Failed));
        assert!(!status.can_transition_to(&TransactionStatus::Pending));
    }

    #[test]
    fn nothing_transitions_back_to_pending() {
        for status in [
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert!(!status.can_transition_to(&TransactionStatus::Pending));
        }
    }

    // Unit Tests - Terminality

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
    }

    #[test]
    fn pending_and_completed_are_not_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Completed.is_terminal());
    }

    // Unit Tests - String conversion

    #[test]
    fn as_str_and_parse_round_trip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_rejects_unknown_status() {
        assert!(TransactionStatus::parse("charged_back").is_err());
        assert!(TransactionStatus::parse("").is_err());
    }

    #[test]
    fn parse_is_case_sensitive() {
        // Case folding happens at the wire boundary, not here.
        assert!(TransactionStatus::parse("Completed").is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    // Additional validation tests

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }
}
