//! Application context with shared state and utilities

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};

use auth_core::kernel::{create_auth_provider, BaseAuthProvider};
use auth_core::AuthConfig;

/// Application context passed to all commands
pub struct AppContext {
    pub quiet: bool,
    pub config: AuthConfig,
    /// Built on first use and shared for the rest of the process
    provider: OnceLock<Arc<dyn BaseAuthProvider>>,
}

impl AppContext {
    pub fn new(quiet: bool) -> Result<Self> {
        let config = AuthConfig::from_env()?;
        Ok(Self {
            quiet,
            config,
            provider: OnceLock::new(),
        })
    }

    /// The auth provider for this process. Only login needs it, so commands
    /// that merely inspect config work without Twilio credentials.
    pub fn provider(&self) -> Result<Arc<dyn BaseAuthProvider>> {
        if let Some(provider) = self.provider.get() {
            return Ok(provider.clone());
        }
        let provider = create_auth_provider(&self.config)?;
        Ok(self.provider.get_or_init(|| provider).clone())
    }

    pub fn theme(&self) -> ColorfulTheme {
        ColorfulTheme::default()
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.quiet {
            return Ok(default);
        }
        Ok(Confirm::with_theme(&self.theme())
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    pub fn print_header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("{}", style(msg).bold());
        }
    }

    pub fn print_success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).green());
        }
    }

    pub fn print_warning(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).yellow());
        }
    }

    pub fn print_info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_context() -> AppContext {
        AppContext {
            quiet: true,
            config: AuthConfig {
                use_dummy_auth: true,
                twilio: None,
                preferences_path: None,
            },
            provider: OnceLock::new(),
        }
    }

    #[tokio::test]
    async fn test_provider_is_shared_across_logins() {
        let ctx = dummy_context();

        let first = ctx.provider().unwrap();
        let challenge = first.issue_challenge("9876543210").await.unwrap();
        let user = first
            .verify_challenge(&challenge.verification_id, "123456")
            .await
            .unwrap();
        first.sign_out().await.unwrap();

        let second = ctx.provider().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let challenge = second.issue_challenge("9876543210").await.unwrap();
        let again = second
            .verify_challenge(&challenge.verification_id, "123456")
            .await
            .unwrap();
        assert_eq!(again.uid, user.uid);
    }

    #[test]
    fn test_real_provider_without_credentials_fails() {
        let mut ctx = dummy_context();
        ctx.config.use_dummy_auth = false;
        assert!(ctx.provider().is_err());
    }
}
