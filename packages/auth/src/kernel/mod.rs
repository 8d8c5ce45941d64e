//! Kernel module - provider infrastructure and wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use twilio::{TwilioOptions, TwilioService};

use crate::config::AuthConfig;
use crate::domains::auth::{DummyAuthSession, TwilioAuthProvider};

pub mod deps;
pub mod session_state;
pub mod test_dependencies;
pub mod traits;

pub use deps::TwilioAdapter;
pub use session_state::{listener, AuthListener, SessionState, Subscription, SubscriptionId};
pub use test_dependencies::MockTwilioService;
pub use traits::*;

/// Pick the provider once, at startup.
pub fn create_auth_provider(config: &AuthConfig) -> Result<Arc<dyn BaseAuthProvider>> {
    if config.use_dummy_auth {
        // Production safety check - dummy auth accepts a fixed code for anyone
        if !cfg!(debug_assertions) {
            warn!("SECURITY WARNING: dummy auth is enabled in a release build!");
        }
        info!("Using dummy auth provider");
        return Ok(Arc::new(DummyAuthSession::new()));
    }

    let twilio = config
        .twilio
        .clone()
        .context("Twilio credentials are required when dummy auth is disabled")?;
    info!("Using Twilio auth provider");
    let service = Arc::new(TwilioService::new(TwilioOptions {
        account_sid: twilio.account_sid,
        auth_token: twilio.auth_token,
        service_id: twilio.verify_service_sid,
    }));
    Ok(Arc::new(TwilioAuthProvider::new(Arc::new(
        TwilioAdapter::new(service),
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwilioCredentials;

    fn config(use_dummy_auth: bool, twilio: Option<TwilioCredentials>) -> AuthConfig {
        AuthConfig {
            use_dummy_auth,
            twilio,
            preferences_path: None,
        }
    }

    #[test]
    fn test_dummy_selected() {
        let provider = create_auth_provider(&config(true, None)).unwrap();
        assert!(provider.is_dummy());
    }

    #[test]
    fn test_real_provider_needs_credentials() {
        let err = create_auth_provider(&config(false, None)).err().unwrap();
        assert!(err.to_string().contains("Twilio credentials"));
    }

    #[test]
    fn test_real_provider_selected() {
        let creds = TwilioCredentials {
            account_sid: "AC_test".to_string(),
            auth_token: "token".to_string(),
            verify_service_sid: "VA_test".to_string(),
        };
        let provider = create_auth_provider(&config(false, Some(creds))).unwrap();
        assert!(!provider.is_dummy());
    }
}
