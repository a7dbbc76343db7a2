//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration
///
/// The gateway signs result notifications with a shared secret agreed in its
/// dashboard. The secret stays a plain `String` here; the notification
/// verifier wraps it in `secrecy::SecretString` on construction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Shared secret used to sign notification payloads
    pub secret: String,

    /// Which gateway environment the secret belongs to
    #[serde(default)]
    pub mode: GatewayMode,
}

/// Gateway environment selector
///
/// Test mode points at the gateway sandbox; live mode at production.
/// Secrets issued for one environment never verify payloads from the other.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Test,
    Live,
}

impl GatewayConfig {
    /// Check if using the gateway sandbox
    pub fn is_test_mode(&self) -> bool {
        self.mode == GatewayMode::Test
    }

    /// Check if using the production gateway
    pub fn is_live_mode(&self) -> bool {
        self.mode == GatewayMode::Live
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_SECRET"));
        }
        if self.secret.len() < 16 {
            return Err(ValidationError::GatewaySecretTooShort);
        }

        // Verify secret prefix against mode for safety
        if self.mode == GatewayMode::Live && self.secret.starts_with("gw_test_") {
            return Err(ValidationError::TestSecretInLiveMode);
        }

        Ok(())
    }
}
