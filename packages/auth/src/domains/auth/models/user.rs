use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of an authenticated phone user.
///
/// Serialized camelCase so the calling layer can persist it and restore a
/// session across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub phone_number: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        uid: impl Into<String>,
        phone_number: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            phone_number: phone_number.into(),
            display_name: display_name.into(),
            created_at: Utc::now(),
        }
    }
}
