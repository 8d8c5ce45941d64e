//! In-memory phone-OTP provider for local development.
//!
//! Accepts a single fixed code for any number, signs new numbers up on first
//! verification and never talks to a network.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::common::AuthError;
use crate::domains::auth::events::AuthEvent;
use crate::domains::auth::models::{normalize_phone_key, verification_id, Challenge, UserRecord};
use crate::kernel::session_state::{AuthListener, SessionState, Subscription};
use crate::kernel::traits::BaseAuthProvider;

/// The only code the dummy provider accepts.
pub const DUMMY_OTP: &str = "123456";

pub const DEFAULT_DISPLAY_NAME: &str = "New User";

#[derive(Debug, Clone)]
struct DummyUser {
    uid: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

pub struct DummyAuthSession {
    users: Mutex<HashMap<String, DummyUser>>,
    state: SessionState,
}

impl DummyAuthSession {
    pub fn new() -> Self {
        Self::with_state(SessionState::new())
    }

    /// Build on an existing session slot (shared with other observers).
    pub fn with_state(state: SessionState) -> Self {
        let mut users = HashMap::new();
        users.insert(
            "1234567890".to_string(),
            DummyUser {
                uid: "dummy-uid-123".to_string(),
                display_name: "Test User".to_string(),
                created_at: Utc::now(),
            },
        );
        Self {
            users: Mutex::new(users),
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, DummyUser>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look the number up, creating the user on first sight.
    fn find_or_create_user(&self, phone_number: &str) -> UserRecord {
        let key = match normalize_phone_key(phone_number) {
            // Digit-free input still needs a distinct key.
            key if key.is_empty() => phone_number.to_string(),
            key => key,
        };

        let mut users = self.users();
        let stored = users.entry(key).or_insert_with(|| {
            let uid = format!("dummy-uid-{}", Uuid::new_v4().simple());
            info!(%uid, phone_number, "[dummy auth] created user");
            DummyUser {
                uid,
                display_name: DEFAULT_DISPLAY_NAME.to_string(),
                created_at: Utc::now(),
            }
        });

        UserRecord {
            uid: stored.uid.clone(),
            phone_number: phone_number.to_string(),
            display_name: stored.display_name.clone(),
            created_at: stored.created_at,
        }
    }
}

impl Default for DummyAuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthProvider for DummyAuthSession {
    async fn issue_challenge(&self, phone_number: &str) -> Result<Challenge, AuthError> {
        info!(phone_number, "[dummy auth] OTP sent");
        self.state.emit(AuthEvent::ChallengeIssued {
            phone_number: phone_number.to_string(),
        });

        Ok(Challenge {
            verification_id: verification_id::encode(phone_number),
            phone_number: phone_number.to_string(),
        })
    }

    async fn verify_challenge(
        &self,
        verification_id: &str,
        code: &str,
    ) -> Result<UserRecord, AuthError> {
        let phone_number = verification_id::extract_phone(verification_id)?;

        if code != DUMMY_OTP {
            info!(phone_number, "[dummy auth] rejected OTP");
            return Err(AuthError::InvalidCode);
        }

        let user = self.find_or_create_user(phone_number);
        info!(uid = %user.uid, phone_number, "[dummy auth] user authenticated");
        self.state.sign_in(user.clone());
        Ok(user)
    }

    fn current_user(&self) -> Option<UserRecord> {
        self.state.current_user()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.state.sign_out() {
            info!("[dummy auth] user signed out");
        }
        Ok(())
    }

    fn subscribe(&self, listener: AuthListener) -> Subscription {
        self.state.subscribe(listener)
    }

    fn is_dummy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_challenge_embeds_phone() {
        let session = DummyAuthSession::new();
        let challenge = session.issue_challenge("9876543210").await.unwrap();

        assert_eq!(challenge.verification_id, "dummy-verification-9876543210");
        assert_eq!(challenge.phone_number, "9876543210");
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_seeded_user_keeps_identity() {
        let session = DummyAuthSession::new();
        let challenge = session.issue_challenge("1234567890").await.unwrap();
        let user = session
            .verify_challenge(&challenge.verification_id, DUMMY_OTP)
            .await
            .unwrap();

        assert_eq!(user.uid, "dummy-uid-123");
        assert_eq!(user.display_name, "Test User");
    }

    #[tokio::test]
    async fn test_formatted_number_maps_to_same_user() {
        let session = DummyAuthSession::new();
        let first = session
            .verify_challenge(&verification_id::encode("98765 43210"), DUMMY_OTP)
            .await
            .unwrap();
        let second = session
            .verify_challenge(&verification_id::encode("9876543210"), DUMMY_OTP)
            .await
            .unwrap();

        assert_eq!(first.uid, second.uid);
        assert_eq!(second.phone_number, "9876543210");
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_before_code_check() {
        let session = DummyAuthSession::new();
        let err = session
            .verify_challenge("VE-not-ours", DUMMY_OTP)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::MalformedVerificationId(_)));
        assert!(!err.is_retryable());
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_challenge_issued_event() {
        let session = DummyAuthSession::new();
        let mut rx = session.state().events();

        session.issue_challenge("9876543210").await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            AuthEvent::ChallengeIssued {
                phone_number: "9876543210".to_string()
            }
        );
    }
}
