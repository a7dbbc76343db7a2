//! Plan catalog entries.
//!
//! A Plan is a purchasable product: either a sending quota ("Letters" plans,
//! bounded by emails included) or an audience size ("Subscribers" plans,
//! bounded by contact-list size with unmetered sending).

use crate::domain::foundation::{PlanId, ValidationError};
use serde::{Deserialize, Serialize};

use super::Money;

/// The dimension a plan is metered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Quota of emails that may be sent during the entitlement window.
    Letters,

    /// Cap on the contact list size; sending itself is unmetered.
    Subscribers,
}

impl PlanType {
    /// Returns the display name for this plan type.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Letters => "Letters",
            PlanType::Subscribers => "Subscribers",
        }
    }

    /// Returns the canonical lowercase string for this plan type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Letters => "letters",
            PlanType::Subscribers => "subscribers",
        }
    }

    /// Parses a plan type from its canonical lowercase string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "letters" => Ok(PlanType::Letters),
            "subscribers" => Ok(PlanType::Subscribers),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Plan catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,

    /// Human-readable plan name.
    pub name: String,

    /// Dimension the plan is metered on.
    pub plan_type: PlanType,

    /// Emails included per entitlement window (quota for Letters plans).
    pub emails_included: i64,

    /// Maximum contact list size.
    pub subscriber_limit: i64,

    /// Price charged for one entitlement window.
    pub price: Money,
}

impl Plan {
    /// Creates a plan catalog entry.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or a limit is negative.
    pub fn new(
        id: PlanId,
        name: impl Into<String>,
        plan_type: PlanType,
        emails_included: i64,
        subscriber_limit: i64,
        price: Money,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if emails_included < 0 {
            return Err(ValidationError::invalid_format(
                "emails_included",
                "must not be negative",
            ));
        }
        if subscriber_limit < 0 {
            return Err(ValidationError::invalid_format(
                "subscriber_limit",
                "must not be negative",
            ));
        }
        Ok(Self {
            id,
            name,
            plan_type,
            emails_included,
            subscriber_limit,
            price,
        })
    }

    /// Returns true if sending under this plan is not bounded by an email quota.
    pub fn unmetered_sending(&self) -> bool {
        matches!(self.plan_type, PlanType::Subscribers)
    }

    /// Emails still available given the grant's usage counter.
    ///
    /// Subscribers plans report their full quota position too; callers decide
    /// whether sending is quota-bound via [`Plan::unmetered_sending`].
    pub fn emails_remaining(&self, emails_sent: i64) -> i64 {
        (self.emails_included - emails_sent).max(0)
    }
}
