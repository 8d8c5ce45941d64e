//! Phone-OTP provider backed by Twilio Verify.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::common::AuthError;
use crate::domains::auth::dummy::DEFAULT_DISPLAY_NAME;
use crate::domains::auth::events::AuthEvent;
use crate::domains::auth::models::{hash_phone_number, Challenge, UserRecord};
use crate::kernel::session_state::{AuthListener, SessionState, Subscription};
use crate::kernel::traits::{BaseAuthProvider, BaseTwilioService, OtpCheck};

/// Real provider. Verification ids are Twilio SIDs, mapped back to the phone
/// number through a pending table instead of being parsed.
pub struct TwilioAuthProvider {
    twilio: Arc<dyn BaseTwilioService>,
    /// verification SID -> phone number. At most one open SID per phone.
    pending: Mutex<HashMap<String, String>>,
    /// uid -> first record seen this process
    known_users: Mutex<HashMap<String, UserRecord>>,
    state: SessionState,
}

impl TwilioAuthProvider {
    pub fn new(twilio: Arc<dyn BaseTwilioService>) -> Self {
        Self {
            twilio,
            pending: Mutex::new(HashMap::new()),
            known_users: Mutex::new(HashMap::new()),
            state: SessionState::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget every open challenge for `phone_number`.
    fn close_challenges(&self, phone_number: &str) {
        self.pending().retain(|_, phone| phone != phone_number);
    }

    fn user_for(&self, phone_number: &str) -> UserRecord {
        let uid = hash_phone_number(phone_number);
        self.known_users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uid.clone())
            .or_insert_with(|| UserRecord::new(uid, phone_number, DEFAULT_DISPLAY_NAME))
            .clone()
    }
}

#[async_trait]
impl BaseAuthProvider for TwilioAuthProvider {
    async fn issue_challenge(&self, phone_number: &str) -> Result<Challenge, AuthError> {
        let sid = self.twilio.send_otp(phone_number).await.map_err(|e| {
            error!("Failed to send OTP: {}", e);
            AuthError::Provider(e)
        })?;

        {
            // A resend supersedes the earlier SID for this phone.
            let mut pending = self.pending();
            pending.retain(|_, phone| phone != phone_number);
            pending.insert(sid.clone(), phone_number.to_string());
        }
        info!("OTP sent successfully to {}", phone_number);
        self.state.emit(AuthEvent::ChallengeIssued {
            phone_number: phone_number.to_string(),
        });

        Ok(Challenge {
            verification_id: sid,
            phone_number: phone_number.to_string(),
        })
    }

    async fn verify_challenge(
        &self,
        verification_id: &str,
        code: &str,
    ) -> Result<UserRecord, AuthError> {
        let phone_number = self
            .pending()
            .get(verification_id)
            .cloned()
            .ok_or_else(|| AuthError::MalformedVerificationId(verification_id.to_string()))?;

        let check = self
            .twilio
            .verify_otp(&phone_number, code)
            .await
            .map_err(|e| {
                error!("OTP verification failed: {}", e);
                AuthError::Provider(e)
            })?;
        match check {
            OtpCheck::Approved => {}
            OtpCheck::Rejected => return Err(AuthError::InvalidCode),
            OtpCheck::Expired => {
                warn!("Verification {} expired", verification_id);
                self.close_challenges(&phone_number);
                return Err(AuthError::ChallengeExpired);
            }
        }

        self.close_challenges(&phone_number);
        let user = self.user_for(&phone_number);
        info!("OTP verified for user {}", user.uid);
        self.state.sign_in(user.clone());
        Ok(user)
    }

    fn current_user(&self) -> Option<UserRecord> {
        self.state.current_user()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.sign_out();
        Ok(())
    }

    fn subscribe(&self, listener: AuthListener) -> Subscription {
        self.state.subscribe(listener)
    }
}
