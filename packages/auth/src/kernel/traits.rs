// Trait definitions for dependency injection
//
// Naming convention: Base* for trait names (e.g., BaseAuthProvider)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::AuthError;
use crate::domains::auth::models::{Challenge, UserRecord};
use crate::kernel::session_state::{AuthListener, Subscription};

// =============================================================================
// Auth Provider Trait (phone OTP identity provider)
// =============================================================================

/// Capability set shared by the simulated and the real phone-auth provider.
///
/// Call sites hold an `Arc<dyn BaseAuthProvider>` chosen once at startup.
#[async_trait]
pub trait BaseAuthProvider: Send + Sync {
    /// Request a verification code for `phone_number`
    async fn issue_challenge(&self, phone_number: &str) -> Result<Challenge, AuthError>;

    /// Complete a challenge; on success the user becomes current
    async fn verify_challenge(
        &self,
        verification_id: &str,
        code: &str,
    ) -> Result<UserRecord, AuthError>;

    fn current_user(&self) -> Option<UserRecord>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Observe session changes until the returned handle is unsubscribed
    fn subscribe(&self, listener: AuthListener) -> Subscription;

    /// True for the in-memory development provider
    fn is_dummy(&self) -> bool {
        false
    }
}

// =============================================================================
// Twilio Service Trait (Infrastructure - SMS/OTP)
// =============================================================================

/// Answer to a code check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Approved,
    /// Wrong code; the verification is still open.
    Rejected,
    /// The verification is gone: expired, consumed, or out of attempts.
    Expired,
}

#[async_trait]
pub trait BaseTwilioService: Send + Sync {
    /// Send OTP code via SMS to phone number, returning the verification SID
    async fn send_otp(&self, phone_number: &str) -> Result<String>;

    /// Verify OTP code for phone number
    async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck>;
}
