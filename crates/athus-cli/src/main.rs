//! Athus CLI - a terminal front end for the Athus local-services marketplace.
//!
//! Logs in, keeps the session fresh, and exposes the profile, signup and
//! address-lookup flows of the mobile app as subcommands.

mod commands;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use athus_core::{
    AuthClient, Config, FileStore, KeyringStore, MemoryStore, Session, StoreKind, TokenStore,
};

/// Log file written under the cache directory
const LOG_FILE: &str = "athus.log";

#[derive(Parser, Debug)]
#[command(name = "athus", version, about = "Athus marketplace client")]
struct Cli {
    /// Backend URL (overrides config and ATHUS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where session tokens are kept
    #[arg(long, global = true, value_enum)]
    store: Option<StoreArg>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreArg {
    File,
    Keyring,
    Memory,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::File => StoreKind::File,
            StoreArg::Keyring => StoreKind::Keyring,
            StoreArg::Memory => StoreKind::Memory,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Defaults to the last email used
        email: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Create an account
    Signup {
        /// Full name, e.g. "Ana Souza"
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Confirm the 6-digit code sent by email
    Verify { email: String, code: String },
    /// Show session and profile state
    Status,
    /// Fetch a user (the logged-in user by default)
    User { id: Option<i64> },
    /// Update profile fields
    UpdateProfile(commands::ProfileArgs),
    /// Look up an address by CEP
    Cep { cep: String },
    /// Check a CPF number
    ValidateCpf { cpf: String },
}

/// Initialize tracing: stderr plus a log file in the cache directory.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG controls the level unless --verbose is given
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn open_store(kind: StoreKind, config: &Config) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match kind {
        StoreKind::File => {
            let dir = config.cache_dir()?;
            Arc::new(FileStore::new(dir))
        }
        StoreKind::Keyring => {
            let store = KeyringStore::new();
            if !store.is_available() {
                warn!("OS keychain is not reachable; session will not be saved");
            }
            Arc::new(store)
        }
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    let log_dir = config.cache_dir().ok();
    let _guard = init_tracing(cli.verbose, log_dir.as_deref());
    info!("Athus CLI starting");

    let store_kind = cli.store.map(StoreKind::from).unwrap_or(config.store);
    let store = open_store(store_kind, &config).context("Failed to open session store")?;
    let session = Arc::new(Session::new(store));

    let base_url = cli.base_url.clone().unwrap_or_else(|| config.base_url());
    debug!(base_url = %base_url, store = ?store_kind, "Client configured");
    let client = AuthClient::with_timeout(&base_url, session, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let mut events = client.subscribe();

    // A failed login reports its own error
    let is_login = matches!(cli.command, Command::Login { .. });
    let result = commands::run(cli.command, &client, &mut config).await;

    // A refresh failure during the command ends the session
    while let Ok(event) = events.try_recv() {
        if !is_login {
            commands::report_session_event(&event);
        }
    }

    result
}
