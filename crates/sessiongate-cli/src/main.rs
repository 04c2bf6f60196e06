//! sessiongate - log in to the identity API, keep the session token fresh,
//! and register new accounts from the command line.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessiongate_core::Config;

/// Log file name in cache directory
const LOG_FILE: &str = "sessiongate.log";

/// sessiongate - credentials login and session token lifecycle
#[derive(Parser)]
#[command(name = "sessiongate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        /// Account username (defaults to the last one used)
        #[arg(short, long)]
        username: Option<String>,

        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },

    /// Show the current session, refreshing the access token if needed
    Session,

    /// Forget the stored session token
    Logout {
        /// Also delete the remembered password
        #[arg(long)]
        forget: bool,
    },

    /// Register a new account
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        /// Agree to the privacy policy
        #[arg(long)]
        accept_privacy_policy: bool,
    },
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr and, when the cache directory is available, to a file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(dir).is_ok() => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    let _log_guard = init_tracing(config.cache_dir().ok().as_deref());
    info!("sessiongate starting");

    match cli.command {
        Commands::Login { username, remember } => commands::login(&mut config, username, remember).await,
        Commands::Session => commands::session(&config).await,
        Commands::Logout { forget } => commands::logout(&config, forget),
        Commands::Register {
            first_name,
            last_name,
            email,
            accept_privacy_policy,
        } => commands::register(&config, first_name, last_name, email, accept_privacy_policy).await,
    }
}
