//! Phone number helpers shared by providers and the login flow.

use sha2::{Digest, Sha256};

/// Country code applied to numbers entered without one.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

const MIN_PHONE_DIGITS: usize = 10;

/// User-store key: the digits of the number, nothing else.
pub fn normalize_phone_key(phone_number: &str) -> String {
    phone_number.chars().filter(char::is_ascii_digit).collect()
}

/// Hash a phone number using SHA256
///
/// Used as the stable uid for users of the real provider, so raw numbers never
/// double as identifiers.
pub fn hash_phone_number(phone_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Loose check run before a challenge is requested.
pub fn is_valid_phone_number(input: &str) -> bool {
    normalize_phone_key(input).len() >= MIN_PHONE_DIGITS
}

/// Put a number into E.164-ish form for the real provider.
///
/// Numbers that already carry a `+` are only trimmed. Otherwise a leading
/// trunk `0` is replaced by the default country code, and anything else is
/// prefixed with it.
pub fn format_phone_number(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with('+') {
        return trimmed.to_string();
    }
    if trimmed.len() == 10 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return format!("{}{}", DEFAULT_COUNTRY_CODE, trimmed);
    }
    match trimmed.strip_prefix('0') {
        Some(rest) => format!("{}{}", DEFAULT_COUNTRY_CODE, rest),
        None => format!("{}{}", DEFAULT_COUNTRY_CODE, trimmed),
    }
}

/// Codes are exactly six ASCII digits.
pub fn is_valid_otp(input: &str) -> bool {
    input.len() == 6 && input.chars().all(|c| c.is_ascii_digit())
}
