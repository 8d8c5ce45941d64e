/// Auth events - facts about authentication state changes
///
/// Errors go in `Result::Err`, not in events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A verification code was requested for a phone number
    ChallengeIssued { phone_number: String },

    /// A challenge was verified and the user is now current
    SignedIn { uid: String, phone_number: String },

    /// The current user signed out
    SignedOut { uid: String },
}
