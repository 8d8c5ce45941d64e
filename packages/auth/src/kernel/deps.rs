// Adapters from concrete infrastructure clients to kernel traits

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use twilio::{TwilioError, TwilioService};

use super::traits::{BaseTwilioService, OtpCheck};

// =============================================================================
// TwilioService Adapter (implements BaseTwilioService trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseTwilioService trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseTwilioService for TwilioAdapter {
    async fn send_otp(&self, phone_number: &str) -> Result<String> {
        let response = self.0.send_otp(phone_number).await?;
        Ok(response.sid)
    }

    async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck> {
        check_outcome(self.0.verify_otp(phone_number, code).await)
    }
}

fn check_outcome(result: Result<bool, TwilioError>) -> Result<OtpCheck> {
    match result {
        Ok(true) => Ok(OtpCheck::Approved),
        Ok(false) => Ok(OtpCheck::Rejected),
        Err(TwilioError::VerificationNotFound) => Ok(OtpCheck::Expired),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_verification_is_expired() {
        let check = check_outcome(Err(TwilioError::VerificationNotFound)).unwrap();
        assert_eq!(check, OtpCheck::Expired);
    }

    #[test]
    fn test_answered_checks() {
        assert_eq!(check_outcome(Ok(true)).unwrap(), OtpCheck::Approved);
        assert_eq!(check_outcome(Ok(false)).unwrap(), OtpCheck::Rejected);
    }

    #[test]
    fn test_api_error_propagates() {
        let err = check_outcome(Err(TwilioError::Api {
            status: twilio::HttpStatus::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }));
        assert!(err.is_err());
    }
}
