//! Monetary value objects.
//!
//! Amounts are fixed-point decimals (`BigDecimal`), never floats: the payment
//! gateway reports amounts as decimal strings and equality must be numeric
//! ("500", "500.0" and "500.00" are the same amount).

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// ISO 4217 style currency code ("RUB", "USD", ...).
///
/// Normalized to uppercase at construction; comparison is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a currency code, rejecting anything but three ASCII letters.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "must be a three-letter currency code",
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative monetary amount in a single currency.
///
/// Equality is numeric on the amount and exact on the currency, which is
/// precisely the comparison the reconciliation amount check needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: BigDecimal,
    currency: CurrencyCode,
}

impl Money {
    /// Creates a monetary value, rejecting negative amounts.
    pub fn new(amount: BigDecimal, currency: CurrencyCode) -> Result<Self, ValidationError> {
        if amount < BigDecimal::from(0) {
            return Err(ValidationError::invalid_format(
                "amount",
                "must not be negative",
            ));
        }
        Ok(Self { amount, currency })
    }

    /// Parses a monetary value from the decimal string and currency code the
    /// gateway reports.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, ValidationError> {
        let amount = BigDecimal::from_str(amount.trim()).map_err(|_| {
            ValidationError::invalid_format("amount", "must be a decimal number")
        })?;
        let currency = CurrencyCode::new(currency)?;
        Self::new(amount, currency)
    }

    /// Returns the amount.
    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    /// Returns the currency code.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount == BigDecimal::from(0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
