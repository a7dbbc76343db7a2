//! Billing policy configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Days a plan grant stays valid after a completed payment
    #[serde(default = "default_entitlement_window_days")]
    pub entitlement_window_days: u32,

    /// Days after completion during which refunds are accepted gateway-side.
    /// Advisory for support tooling; the reconciler applies refunds whenever
    /// the gateway reports them.
    #[serde(default = "default_refund_window_days")]
    pub refund_window_days: u32,

    /// Whether expiring grants are renewed automatically
    #[serde(default)]
    pub autorenewal_enabled: bool,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entitlement_window_days == 0 || self.entitlement_window_days > 365 {
            return Err(ValidationError::InvalidEntitlementWindow);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            entitlement_window_days: default_entitlement_window_days(),
            refund_window_days: default_refund_window_days(),
            autorenewal_enabled: false,
        }
    }
}

fn default_entitlement_window_days() -> u32 {
    30
}

fn default_refund_window_days() -> u32 {
    14
}
