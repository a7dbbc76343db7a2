//! Payment callback signature verification.
//!
//! Implements verification of gateway callback signatures using HMAC-SHA256
//! over a canonicalized form of the posted fields. Verification never fails
//! loudly; any defect in the payload or the code yields `false`.

use std::collections::{BTreeMap, HashMap};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Form field carrying the gateway's signature code. Excluded from
/// canonicalization so the gateway can sign the rest of the payload.
pub const SIGNATURE_FIELD: &str = "signature";

/// Verifier for payment gateway callback signatures.
///
/// The gateway signs the canonical payload with a shared secret:
/// values of all non-signature fields, ordered by field name (byte order),
/// each value followed by `;`. The code is the lowercase hex HMAC-SHA256.
#[derive(Clone)]
pub struct NotificationVerifier {
    /// Shared signing secret from the gateway dashboard.
    secret: SecretString,
}

impl NotificationVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    /// Verifies the supplied signature code against the posted fields.
    ///
    /// Returns `false` for any mismatch, including a missing secret, an
    /// empty payload, or a code that is not the exact lowercase hex the
    /// gateway would have produced. Never returns an error.
    pub fn verify(&self, fields: &HashMap<String, String>, supplied_code: &str) -> bool {
        // 1. A verifier without a secret can never authenticate anything
        if self.secret.expose_secret().is_empty() {
            return false;
        }

        // 2. An empty payload has nothing to authenticate
        if !fields.keys().any(|k| k.as_str() != SIGNATURE_FIELD) {
            return false;
        }

        // 3. Compute the expected code over the canonical payload
        let expected = self.compute_signature(fields);

        // 4. Compare codes (constant-time)
        constant_time_compare(expected.as_bytes(), supplied_code.as_bytes())
    }

    /// Computes the lowercase hex HMAC-SHA256 code for the given fields.
    fn compute_signature(&self, fields: &HashMap<String, String>) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(canonical_payload(fields).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Builds the canonical signing payload: values of all non-signature fields,
/// sorted by field name in ascending byte order, each followed by `;`.
/// Values are taken verbatim, without escaping.
fn canonical_payload(fields: &HashMap<String, String>) -> String {
    let ordered: BTreeMap<&str, &str> = fields
        .iter()
        .filter(|(name, _)| name.as_str() != SIGNATURE_FIELD)
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    let mut canonical = String::new();
    for value in ordered.values() {
        canonical.push_str(value);
        canonical.push(';');
    }
    canonical
}

/// SHA-256 digest of the canonical payload, as lowercase hex.
///
/// Safe to log where the payload itself must not appear.
pub fn payload_digest(fields: &HashMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_payload(fields).as_bytes());
    hex::encode(hasher.finalize())
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the gateway signature code for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, fields: &HashMap<String, String>) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(canonical_payload(fields).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
