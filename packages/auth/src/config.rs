use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Auth configuration resolved once at startup
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub use_dummy_auth: bool,
    pub twilio: Option<TwilioCredentials>,
    /// Where the dummy-auth preference is persisted (None if no config dir)
    pub preferences_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub verify_service_sid: String,
}

impl AuthConfig {
    /// Load configuration from environment variables and stored preferences
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let preferences_path = preferences_path_from_env();
        let preferences = preferences_path
            .as_deref()
            .map(AuthPreferences::load_from)
            .unwrap_or_default();
        let app_env = env::var("APP_ENV").ok();

        Ok(Self {
            use_dummy_auth: resolve_use_dummy_auth(
                preferences.use_dummy_auth,
                app_env.as_deref(),
                cfg!(debug_assertions),
            ),
            twilio: TwilioCredentials::from_env()?,
            preferences_path,
        })
    }
}

impl TwilioCredentials {
    /// `None` when no Twilio account is configured at all
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(account_sid) = env::var("TWILIO_ACCOUNT_SID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            account_sid,
            auth_token: env::var("TWILIO_AUTH_TOKEN")
                .context("TWILIO_AUTH_TOKEN must be set")?,
            verify_service_sid: env::var("TWILIO_VERIFY_SERVICE_SID")
                .context("TWILIO_VERIFY_SERVICE_SID must be set")?,
        }))
    }
}

/// Stored preference beats the environment. Without `APP_ENV`, debug builds
/// default to dummy auth.
pub fn resolve_use_dummy_auth(
    preference: Option<bool>,
    app_env: Option<&str>,
    debug_build: bool,
) -> bool {
    if let Some(use_dummy) = preference {
        return use_dummy;
    }
    match app_env {
        Some(app_env) => app_env.eq_ignore_ascii_case("development"),
        None => debug_build,
    }
}

pub fn preferences_path_from_env() -> Option<PathBuf> {
    env::var("AUTH_PREFERENCES_PATH")
        .ok()
        .map(PathBuf::from)
        .or_else(AuthPreferences::default_path)
}

// =============================================================================
// Persisted preferences
// =============================================================================

/// User preferences stored in ~/.config/finupi/prefs.json
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPreferences {
    /// Explicit dummy-auth choice; unset defers to the environment
    #[serde(default)]
    pub use_dummy_auth: Option<bool>,
}

impl AuthPreferences {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("finupi").join("prefs.json"))
    }

    /// Load preferences from disk. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(data) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&data) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt preferences file");
                Self::default()
            }
        }
    }

    /// Save preferences to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Persist an explicit choice, or clear it with `None`.
    ///
    /// Takes effect on the next start; the provider is only chosen once.
    pub fn set_use_dummy_auth(path: &Path, use_dummy: Option<bool>) -> Result<Self> {
        let mut prefs = Self::load_from(path);
        prefs.use_dummy_auth = use_dummy;
        prefs.save_to(path)?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_wins_over_environment() {
        assert!(resolve_use_dummy_auth(Some(true), Some("production"), false));
        assert!(!resolve_use_dummy_auth(Some(false), Some("development"), true));
    }

    #[test]
    fn test_environment_flag() {
        assert!(resolve_use_dummy_auth(None, Some("development"), false));
        assert!(!resolve_use_dummy_auth(None, Some("production"), true));
    }

    #[test]
    fn test_build_flag_when_environment_unset() {
        assert!(resolve_use_dummy_auth(None, None, true));
        assert!(!resolve_use_dummy_auth(None, None, false));
    }

    #[test]
    fn test_missing_preferences_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = AuthPreferences::load_from(&dir.path().join("prefs.json"));
        assert_eq!(prefs, AuthPreferences::default());
    }

    #[test]
    fn test_corrupt_preferences_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(AuthPreferences::load_from(&path).use_dummy_auth, None);
    }

    #[test]
    fn test_set_and_clear_preference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        AuthPreferences::set_use_dummy_auth(&path, Some(false)).unwrap();
        assert_eq!(AuthPreferences::load_from(&path).use_dummy_auth, Some(false));

        AuthPreferences::set_use_dummy_auth(&path, None).unwrap();
        assert_eq!(AuthPreferences::load_from(&path).use_dummy_auth, None);
    }
}
