use thiserror::Error;

/// Failures surfaced by an auth provider.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong code. The same verification id may be retried.
    #[error("Invalid OTP code")]
    InvalidCode,

    /// The id does not identify a challenge this provider issued.
    #[error("Malformed verification id: {0}")]
    MalformedVerificationId(String),

    /// The challenge can no longer be completed; a new one must be issued.
    #[error("Verification expired")]
    ChallengeExpired,

    #[error("Auth provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

impl AuthError {
    /// Whether the caller may retry with the same verification id.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::InvalidCode)
    }
}
