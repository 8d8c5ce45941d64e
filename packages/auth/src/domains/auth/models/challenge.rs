use serde::{Deserialize, Serialize};

/// One outstanding verification attempt for a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub verification_id: String,
    pub phone_number: String,
}
