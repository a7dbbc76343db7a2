//! Payment gateway notification types.
//!
//! Defines the typed form of a gateway callback payload. The gateway posts a
//! flat map of string fields; only the fields relevant to reconciliation are
//! extracted here.

use std::collections::HashMap;

use crate::domain::foundation::ValidationError;

use super::{Money, TransactionStatus};

/// Form field carrying the gateway's payment reference.
pub const FIELD_PAYMENT_ID: &str = "payment_id";

/// Form field carrying the reported payment status.
pub const FIELD_STATUS: &str = "status";

/// Form field carrying the payment amount as a decimal string.
pub const FIELD_AMOUNT: &str = "amount";

/// Form field carrying the ISO 4217 currency code.
pub const FIELD_CURRENCY: &str = "currency";

/// A payment gateway notification, extracted from the raw callback fields.
///
/// Carries the verification result alongside the typed payload so that
/// downstream reconciliation never has to re-derive it from the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// External payment reference assigned at initiation (e.g. "pay_1").
    pub external_id: String,

    /// Status the gateway reports for the payment.
    pub status: TransactionStatus,

    /// Amount and currency the gateway reports as charged.
    pub amount: Money,

    /// Whether the payload signature checked out against our secret.
    pub verified: bool,
}

impl PaymentNotification {
    /// Extracts a typed notification from raw callback fields.
    ///
    /// Status matching is case-insensitive and tolerant of surrounding
    /// whitespace; gateways are inconsistent about casing. A reported status
    /// of `pending` is rejected because gateways only notify about outcomes.
    ///
    /// # Errors
    ///
    /// Returns error if a required field is missing or malformed.
    pub fn from_fields(
        fields: &HashMap<String, String>,
        verified: bool,
    ) -> Result<Self, ValidationError> {
        let external_id = required(fields, FIELD_PAYMENT_ID)?;
        let raw_status = required(fields, FIELD_STATUS)?;
        let raw_amount = required(fields, FIELD_AMOUNT)?;
        let raw_currency = required(fields, FIELD_CURRENCY)?;

        let status = TransactionStatus::parse(&raw_status.trim().to_ascii_lowercase())?;
        if status == TransactionStatus::Pending {
            return Err(ValidationError::invalid_format(
                FIELD_STATUS,
                "'pending' is not a reportable status",
            ));
        }

        let amount = Money::parse(raw_amount.trim(), raw_currency.trim())?;

        Ok(Self {
            external_id: external_id.to_string(),
            status,
            amount,
            verified,
        })
    }
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, ValidationError> {
    match fields.get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
        _ => Err(ValidationError::empty_field(name)),
    }
}

/// Builder for raw callback field maps in tests.
#[cfg(test)]
pub struct NotificationFieldsBuilder {
    fields: HashMap<String, String>,
}

#[cfg(test)]
impl Default for NotificationFieldsBuilder {
    fn default() -> Self {
        let mut fields = HashMap::new();
        fields.insert(FIELD_PAYMENT_ID.to_string(), "pay_1".to_string());
        fields.insert(FIELD_STATUS.to_string(), "completed".to_string());
        fields.insert(FIELD_AMOUNT.to_string(), "500.00".to_string());
        fields.insert(FIELD_CURRENCY.to_string(), "RUB".to_string());
        Self { fields }
    }
}

#[cfg(test)]
impl NotificationFieldsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_id(self, value: impl Into<String>) -> Self {
        self.set(FIELD_PAYMENT_ID, value)
    }

    pub fn status(self, value: impl Into<String>) -> Self {
        self.set(FIELD_STATUS, value)
    }

    pub fn amount(self, value: impl Into<String>) -> Self {
        self.set(FIELD_AMOUNT, value)
    }

    pub fn currency(self, value: impl Into<String>) -> Self {
        self.set(FIELD_CURRENCY, value)
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.fields.remove(name);
        self
    }

    pub fn build(self) -> HashMap<String, String> {
        self.fields
    }
}
