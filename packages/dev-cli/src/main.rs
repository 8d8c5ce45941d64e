mod cmd;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Select};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmd::mode::DummyMode;
use context::AppContext;

#[derive(Parser)]
#[command(name = "dev", about = "FinUPI developer CLI")]
struct Cli {
    /// Suppress decorative output and accept prompt defaults
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a phone number and OTP
    Login {
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Show the resolved auth provider
    Status,
    /// Persist the dummy-auth preference
    UseDummy {
        #[arg(value_enum)]
        mode: DummyMode,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,auth_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.quiet)?;

    match cli.command {
        Some(Commands::Login { phone, code }) => cmd::login::run_login(&ctx, phone, code).await,
        Some(Commands::Status) => {
            cmd::status::show_status(&ctx);
            Ok(())
        }
        Some(Commands::UseDummy { mode }) => cmd::mode::set_dummy_mode(&ctx, mode),
        None => interactive(&ctx).await,
    }
}

async fn interactive(ctx: &AppContext) -> Result<()> {
    print_banner();

    loop {
        println!();
        let options = vec![
            "📱 Log in",
            "🔍 Auth status",
            "🧪 Toggle dummy auth",
            "🛑 Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => cmd::login::run_login(ctx, None, None).await?,
            1 => cmd::status::show_status(ctx),
            2 => cmd::mode::toggle_dummy_mode(ctx)?,
            _ => {
                println!("{}", "👋 Goodbye!".bright_blue());
                break;
            }
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        "╔════════════════════════════════════════╗".bright_cyan()
    );
    println!(
        "{}",
        "║          FinUPI Dev CLI                ║".bright_cyan()
    );
    println!(
        "{}",
        "╚════════════════════════════════════════╝".bright_cyan()
    );
}
