//! Interactive phone login against the configured provider

use anyhow::Result;
use console::style;
use dialoguer::Input;
use tracing::{debug, info};

use auth_core::domains::auth::{LoginFlow, LoginStep, DUMMY_OTP};
use auth_core::kernel::listener;

use crate::context::AppContext;

/// Drive the login flow until the user is signed in.
///
/// `phone` and `code` pre-fill the first prompt of each step.
pub async fn run_login(ctx: &AppContext, phone: Option<String>, code: Option<String>) -> Result<()> {
    let provider = ctx.provider()?;
    let _subscription = provider.subscribe(listener(|user| {
        match user {
            Some(user) => info!(uid = %user.uid, "auth state: signed in"),
            None => debug!("auth state: signed out"),
        }
        Ok(())
    }));

    ctx.print_header("Phone login");
    if provider.is_dummy() {
        ctx.print_warning(&format!("Dummy auth is active. Use OTP {}", DUMMY_OTP));
    }

    let mut flow = LoginFlow::new(provider);
    let mut phone = phone;
    let mut code = code;

    loop {
        match flow.step().clone() {
            LoginStep::EnterPhone => {
                let input = match phone.take() {
                    Some(phone) => phone,
                    None => Input::<String>::with_theme(&ctx.theme())
                        .with_prompt("Phone number (e.g., 9876543210)")
                        .interact_text()?,
                };
                match flow.submit_phone(&input).await {
                    Ok(challenge) => {
                        ctx.print_info(&format!("OTP sent to {}", challenge.phone_number))
                    }
                    Err(e) => ctx.print_warning(e.user_message()),
                }
            }
            LoginStep::EnterCode { .. } => {
                let input = match code.take() {
                    Some(code) => code,
                    None => Input::<String>::with_theme(&ctx.theme())
                        .with_prompt("OTP (leave blank to change number)")
                        .allow_empty(true)
                        .interact_text()?,
                };
                if input.trim().is_empty() {
                    flow.try_again();
                    continue;
                }
                if let Err(e) = flow.submit_code(&input).await {
                    ctx.print_warning(e.user_message());
                }
            }
            LoginStep::SignedIn { user } => {
                ctx.print_success(&format!(
                    "Signed in as {} ({})",
                    user.display_name, user.phone_number
                ));
                if !ctx.quiet {
                    println!("  uid: {}", style(&user.uid).cyan());
                }
                if ctx.confirm("Sign out now?", false)? {
                    flow.sign_out().await?;
                    ctx.print_info("Signed out");
                }
                return Ok(());
            }
        }
    }
}
