//! Show which auth provider would be used and why

use console::style;

use auth_core::AuthPreferences;

use crate::context::AppContext;

pub fn show_status(ctx: &AppContext) {
    ctx.print_header("Auth Status");
    println!();

    let provider = if ctx.config.use_dummy_auth {
        style("dummy").yellow()
    } else {
        style("twilio").green()
    };
    println!("  Provider: {}", provider);

    match ctx.config.preferences_path.as_deref() {
        Some(path) => {
            let prefs = AuthPreferences::load_from(path);
            let stored = match prefs.use_dummy_auth {
                Some(true) => "on",
                Some(false) => "off",
                None => "not set",
            };
            println!("  Stored preference: {}", style(stored).cyan());
            println!("  Preferences file: {}", path.display());
        }
        None => println!("  Preferences file: {}", style("unavailable").red()),
    }

    let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "(unset)".to_string());
    println!("  APP_ENV: {}", style(app_env).cyan());

    let twilio = if ctx.config.twilio.is_some() {
        style("configured").green()
    } else {
        style("not configured").dim()
    };
    println!("  Twilio: {}", twilio);
}
