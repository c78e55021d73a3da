//! # Hosted payment page signatures
//!
//! Requests to the gateway's hosted payment page, and the notifications it sends back, are authenticated with an
//! HMAC-SHA256 over a subset of the form fields. The subset, and its order, is named in the `signed_field_names` field
//! itself:
//!
//! ```text
//!    signed_field_names = "access_key,profile_id,transaction_uuid,...,signed_field_names"
//!    message            = "access_key=abc,profile_id=xyz,transaction_uuid=TXN...,...,signed_field_names=access_key,..."
//!    signature          = base64(HMAC-SHA256(secret_key, message))
//! ```
//!
//! The field values are joined verbatim. A field that is named in `signed_field_names` but missing from the form makes
//! the signature invalid.
use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNED_FIELD_NAMES: &str = "signed_field_names";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Signed field '{0}' is missing from the form")]
    MissingField(String),
    #[error("The form does not list any signed fields")]
    NoSignedFields,
    #[error("The signature is not valid base64")]
    InvalidEncoding,
    #[error("The secret key cannot be used for HMAC")]
    InvalidKey,
    #[error("No gateway secret key is configured")]
    NoSecretKey,
    #[error("The signature does not match")]
    Mismatch,
}

/// Builds the message that is signed: `name=value` pairs for every name in `signed_field_names`, joined by commas.
pub fn signing_message(fields: &BTreeMap<String, String>) -> Result<String, SignatureError> {
    let names = fields.get(SIGNED_FIELD_NAMES).ok_or(SignatureError::NoSignedFields)?;
    let parts = signed_names(names)
        .map(|name| {
            fields
                .get(name)
                .map(|value| format!("{name}={value}"))
                .ok_or_else(|| SignatureError::MissingField(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if parts.is_empty() {
        return Err(SignatureError::NoSignedFields);
    }
    Ok(parts.join(","))
}

pub fn signed_names(signed_field_names: &str) -> impl Iterator<Item = &str> {
    signed_field_names.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Signs the form, returning the base64-encoded signature.
pub fn sign_fields(fields: &BTreeMap<String, String>, secret: &str) -> Result<String, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecretKey);
    }
    let message = signing_message(fields)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the form fields. The comparison runs in constant time. An empty secret never verifies.
pub fn verify_signature(
    fields: &BTreeMap<String, String>,
    signature: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecretKey);
    }
    let message = signing_message(fields)?;
    let expected = STANDARD.decode(signature.trim()).map_err(|_| SignatureError::InvalidEncoding)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}
