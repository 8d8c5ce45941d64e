//! Phone login flow: enter number, enter code, signed in.
//!
//! Input validation happens here, before the provider is called. Provider
//! errors are mapped to the next step: a wrong code keeps the code step open
//! for another attempt, anything else sends the user back to phone entry.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::common::AuthError;
use crate::domains::auth::models::phone::{format_phone_number, is_valid_otp, is_valid_phone_number};
use crate::domains::auth::models::{Challenge, UserRecord};
use crate::kernel::traits::BaseAuthProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    EnterPhone,
    EnterCode { challenge: Challenge },
    SignedIn { user: UserRecord },
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid phone number")]
    InvalidPhoneNumber,

    #[error("OTP must be 6 digits")]
    InvalidOtpFormat,

    #[error("no verification in progress")]
    NoChallenge,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FlowError {
    /// Text to show next to the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            FlowError::InvalidPhoneNumber => "Please enter a valid phone number",
            FlowError::InvalidOtpFormat => "Please enter a valid 6-digit OTP",
            FlowError::NoChallenge => "Please request an OTP first.",
            FlowError::Auth(AuthError::InvalidCode) => {
                "The OTP you entered is incorrect. Please check and try again."
            }
            FlowError::Auth(AuthError::MalformedVerificationId(_)) => {
                "This verification is no longer valid. Please request a new OTP."
            }
            FlowError::Auth(AuthError::ChallengeExpired) => {
                "OTP has expired. Please request a new one."
            }
            FlowError::Auth(AuthError::Provider(_)) => "Something went wrong. Please try again.",
        }
    }
}

pub struct LoginFlow {
    provider: Arc<dyn BaseAuthProvider>,
    step: LoginStep,
}

impl LoginFlow {
    /// Starts signed in when the provider already has a current user.
    pub fn new(provider: Arc<dyn BaseAuthProvider>) -> Self {
        let step = match provider.current_user() {
            Some(user) => LoginStep::SignedIn { user },
            None => LoginStep::EnterPhone,
        };
        Self { provider, step }
    }

    pub fn step(&self) -> &LoginStep {
        &self.step
    }

    pub fn provider(&self) -> &Arc<dyn BaseAuthProvider> {
        &self.provider
    }

    /// Request a code. Also used to resend from the code step.
    pub async fn submit_phone(&mut self, input: &str) -> Result<Challenge, FlowError> {
        if !is_valid_phone_number(input) {
            return Err(FlowError::InvalidPhoneNumber);
        }

        // The dummy provider keys users by the number as typed.
        let phone_number = if self.provider.is_dummy() {
            input.trim().to_string()
        } else {
            format_phone_number(input)
        };

        match self.provider.issue_challenge(&phone_number).await {
            Ok(challenge) => {
                self.step = LoginStep::EnterCode {
                    challenge: challenge.clone(),
                };
                Ok(challenge)
            }
            Err(e) => {
                warn!(error = %e, "failed to issue challenge");
                self.step = LoginStep::EnterPhone;
                Err(e.into())
            }
        }
    }

    pub async fn submit_code(&mut self, code: &str) -> Result<UserRecord, FlowError> {
        let LoginStep::EnterCode { challenge } = &self.step else {
            return Err(FlowError::NoChallenge);
        };
        let code = code.trim();
        if !is_valid_otp(code) {
            return Err(FlowError::InvalidOtpFormat);
        }

        let verification_id = challenge.verification_id.clone();
        let result = self.provider.verify_challenge(&verification_id, code).await;
        match result {
            Ok(user) => {
                info!(uid = %user.uid, "login complete");
                self.step = LoginStep::SignedIn { user: user.clone() };
                Ok(user)
            }
            Err(e) if e.is_retryable() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "verification failed, restarting login");
                self.step = LoginStep::EnterPhone;
                Err(e.into())
            }
        }
    }

    /// Abandon the current challenge and go back to phone entry.
    pub fn try_again(&mut self) {
        self.step = LoginStep::EnterPhone;
    }

    pub async fn sign_out(&mut self) -> Result<(), FlowError> {
        self.provider.sign_out().await?;
        self.step = LoginStep::EnterPhone;
        Ok(())
    }
}
