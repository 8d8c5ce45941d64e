use serde::Deserialize;

/// Response from `POST /Services/{sid}/Verifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct OTPResponse {
    /// Verification SID (`VE...`), opaque to callers.
    pub sid: String,
    pub to: String,
    pub channel: String,
    pub status: String,
}

/// Response from `POST /Services/{sid}/VerificationCheck`.
#[derive(Debug, Clone, Deserialize)]
pub struct OTPVerifyResponse {
    pub to: String,
    pub status: String,
    #[serde(default)]
    pub valid: bool,
}

impl OTPVerifyResponse {
    pub fn is_approved(&self) -> bool {
        self.status == "approved"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_approved() {
        let body = r#"{"to":"+919876543210","status":"approved","valid":true,"sid":"VE1"}"#;
        let parsed: OTPVerifyResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.is_approved());
        assert!(parsed.valid);
    }

    #[test]
    fn test_verify_response_pending_without_valid_field() {
        let body = r#"{"to":"+919876543210","status":"pending"}"#;
        let parsed: OTPVerifyResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.is_approved());
        assert!(!parsed.valid);
    }

    #[test]
    fn test_otp_response_ignores_extra_fields() {
        let body = r#"{"sid":"VE123","to":"+919876543210","channel":"sms","status":"pending","lookup":{}}"#;
        let parsed: OTPResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sid, "VE123");
        assert_eq!(parsed.channel, "sms");
    }
}
