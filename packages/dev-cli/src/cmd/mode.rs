//! Persisted dummy-auth preference

use anyhow::{Context, Result};
use clap::ValueEnum;

use auth_core::{resolve_use_dummy_auth, AuthPreferences};

use crate::context::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DummyMode {
    On,
    Off,
    /// Forget the stored choice and follow the environment again
    Reset,
}

impl DummyMode {
    fn preference(self) -> Option<bool> {
        match self {
            DummyMode::On => Some(true),
            DummyMode::Off => Some(false),
            DummyMode::Reset => None,
        }
    }

    /// The opposite of what the next start would pick.
    fn toggled(stored: Option<bool>, app_env: Option<&str>, debug_build: bool) -> Self {
        if resolve_use_dummy_auth(stored, app_env, debug_build) {
            DummyMode::Off
        } else {
            DummyMode::On
        }
    }
}

/// Flip the stored preference, reading it fresh so repeated toggles alternate.
pub fn toggle_dummy_mode(ctx: &AppContext) -> Result<()> {
    let stored = ctx
        .config
        .preferences_path
        .as_deref()
        .and_then(|path| AuthPreferences::load_from(path).use_dummy_auth);
    let app_env = std::env::var("APP_ENV").ok();

    let mode = DummyMode::toggled(stored, app_env.as_deref(), cfg!(debug_assertions));
    set_dummy_mode(ctx, mode)
}

pub fn set_dummy_mode(ctx: &AppContext, mode: DummyMode) -> Result<()> {
    let path = ctx
        .config
        .preferences_path
        .as_deref()
        .context("No config directory found; set AUTH_PREFERENCES_PATH")?;

    AuthPreferences::set_use_dummy_auth(path, mode.preference())?;

    match mode {
        DummyMode::On => ctx.print_success("Dummy auth enabled"),
        DummyMode::Off => ctx.print_success("Dummy auth disabled"),
        DummyMode::Reset => ctx.print_success("Dummy auth preference cleared"),
    }
    ctx.print_info(&format!("Saved to {}", path.display()));
    ctx.print_info("Restart the app for the change to take effect.");
    Ok(())
}
