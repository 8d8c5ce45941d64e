//! Dummy verification ids embed the phone number so verification can recover
//! it without a side table: `dummy-verification-<phone>`.

use crate::common::AuthError;

pub const VERIFICATION_ID_PREFIX: &str = "dummy-verification-";

pub fn encode(phone_number: &str) -> String {
    format!("{}{}", VERIFICATION_ID_PREFIX, phone_number)
}

/// Recover the phone number from an id produced by [`encode`].
///
/// Everything after the prefix is the phone number, so numbers containing
/// `-` survive the round trip.
pub fn extract_phone(verification_id: &str) -> Result<&str, AuthError> {
    match verification_id.strip_prefix(VERIFICATION_ID_PREFIX) {
        Some(phone) if !phone.is_empty() => Ok(phone),
        _ => Err(AuthError::MalformedVerificationId(
            verification_id.to_string(),
        )),
    }
}
