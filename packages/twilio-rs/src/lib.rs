//! Minimal Twilio Verify client for phone OTP delivery and checking.

use std::collections::HashMap;

pub mod models;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error};

use crate::models::{OTPResponse, OTPVerifyResponse};

pub use reqwest::StatusCode as HttpStatus;

const VERIFY_BASE_URL: &str = "https://verify.twilio.com/v2";

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("request to Twilio failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Twilio returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The verification expired, was already approved, or ran out of attempts.
    #[error("verification not found or expired")]
    VerificationNotFound,
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
    base_url: String,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
            base_url: VERIFY_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different Verify host (local stubs, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "{base}/Services/{serv_id}/{resource}",
            base = self.base_url.trim_end_matches('/'),
            serv_id = self.options.service_id,
        )
    }

    /// Start a verification. The returned SID identifies the attempt.
    pub async fn send_otp(&self, recipient: &str) -> Result<OTPResponse, TwilioError> {
        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Channel", channel_for(recipient));

        let response = self
            .client
            .post(self.service_url("Verifications"))
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Twilio rejected verification request");
            return Err(TwilioError::Api { status, body });
        }

        let data = response.json::<OTPResponse>().await?;
        debug!(sid = %data.sid, status = %data.status, "verification started");
        Ok(data)
    }

    /// Check a code. `Ok(false)` means Twilio answered but did not approve it;
    /// a verification that no longer exists is `VerificationNotFound`.
    pub async fn verify_otp(&self, recipient: &str, code: &str) -> Result<bool, TwilioError> {
        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Code", code);

        let response = self
            .client
            .post(self.service_url("VerificationCheck"))
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        // Twilio answers 404 once a verification has expired or been consumed.
        if status == StatusCode::NOT_FOUND {
            debug!(%recipient, "verification check found no pending verification");
            return Err(TwilioError::VerificationNotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Twilio rejected verification check");
            return Err(TwilioError::Api { status, body });
        }

        let data = response.json::<OTPVerifyResponse>().await?;
        Ok(data.is_approved())
    }
}

/// Twilio Verify picks the delivery channel from the recipient shape.
fn channel_for(recipient: &str) -> &'static str {
    if recipient.contains('@') {
        "email"
    } else {
        "sms"
    }
}
