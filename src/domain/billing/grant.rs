//! Plan grant aggregate entity.
//!
//! A PlanGrant is the user's entitlement period: it is created exactly once
//! when a payment completes, runs for the configured entitlement window, and
//! may be deactivated by a refund or superseded by a newer purchase.
//!
//! # Invariants
//!
//! - At most one grant is *current* (active and unexpired) per user
//! - Every grant remembers the transaction that created it, so a refund only
//!   revokes the entitlement that payment bought

use crate::domain::foundation::{GrantId, PlanId, Timestamp, TransactionId, UserId};
use serde::{Deserialize, Serialize};

/// Plan grant aggregate - a user's entitlement to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGrant {
    /// Unique identifier for this grant.
    pub id: GrantId,

    /// User the entitlement belongs to.
    pub user_id: UserId,

    /// Plan the entitlement confers.
    pub plan_id: PlanId,

    /// Transaction whose completion created this grant.
    pub transaction_id: TransactionId,

    /// Start of the entitlement period.
    pub starts_at: Timestamp,

    /// End of the entitlement period (start + entitlement window).
    pub expires_at: Timestamp,

    /// False once superseded by a newer grant or revoked by a refund.
    pub active: bool,

    /// Emails sent against this grant's quota.
    pub emails_sent: i64,
}

impl PlanGrant {
    /// Creates a fresh active grant starting now.
    pub fn activate(
        id: GrantId,
        user_id: UserId,
        plan_id: PlanId,
        transaction_id: TransactionId,
        now: Timestamp,
        window_days: u32,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_id,
            transaction_id,
            starts_at: now,
            expires_at: now.add_days(i64::from(window_days)),
            active: true,
            emails_sent: 0,
        }
    }

    /// Deactivates this grant (refund or supersession).
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Returns true once the entitlement period has ended.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.expires_at <= *now
    }

    /// Returns true if this grant currently confers access.
    pub fn is_current(&self, now: &Timestamp) -> bool {
        self.active && !self.is_expired(now)
    }

    /// Returns true if this grant was created by the given transaction.
    ///
    /// Refund handling uses this to revoke only the entitlement the refunded
    /// payment bought.
    pub fn was_created_by(&self, transaction_id: &TransactionId) -> bool {
        self.transaction_id == *transaction_id
    }

    /// Adds sent emails to this grant's usage counter.
    pub fn record_emails(&mut self, count: u32) {
        self.emails_sent += i64::from(count);
    }
}
