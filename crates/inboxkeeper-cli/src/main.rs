//! inboxkeeper - dump your private-message inbox and threads as JSON.
//!
//! Logs in with your username and password, then prints either the full
//! inbox or the complete conversations with the given peers to stdout.

mod credentials;

use std::io;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use inboxkeeper_core::config::{Config, UpstreamConfig};
use inboxkeeper_core::portal::{InboxPortal, LoginGrant};

use credentials::CredentialStore;

#[derive(Debug, Parser)]
#[command(name = "inboxkeeper", version, about = "Export your inbox and message threads as JSON")]
struct Cli {
    /// Account username (defaults to the last one used)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Account password (otherwise read from the keychain or prompted)
    #[arg(long, env = "INBOXKEEPER_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Save the password in the OS keychain after a successful login
    #[arg(long, global = true)]
    remember: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every inbox thread
    Inbox,
    /// Print the full conversation with each peer
    Messages {
        /// Comma-separated peer usernames, e.g. "alice,bob"
        peers: String,
    },
    /// Remove the stored password for the user
    Forget,
}

enum Export<'a> {
    Inbox,
    Messages(&'a str),
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
}

/// Saved upstream settings with `INBOXKEEPER_*` overrides applied for this run only
fn upstream_for_run(config: &Config) -> UpstreamConfig {
    config
        .effective_upstream(|name| std::env::var(name).ok())
        .unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring invalid environment override");
            config.upstream.clone()
        })
}

fn resolve_password(cli: &Cli, username: &str) -> Result<String> {
    if let Some(ref password) = cli.password {
        return Ok(password.clone());
    }
    if let Some(password) = CredentialStore::get_password(username) {
        info!(username = %username, "Using password from keychain");
        return Ok(password);
    }
    rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")
}

async fn login(portal: &InboxPortal, cli: &Cli, username: &str) -> Result<LoginGrant> {
    let password = resolve_password(cli, username)?;
    let grant = match portal.login(username, &password).await {
        Ok(grant) => grant,
        Err(e) => {
            warn!(error = %e, "Login failed");
            bail!("{}", e.public_message());
        }
    };

    if cli.remember {
        if let Err(e) = CredentialStore::store(&grant.username, &password) {
            warn!(error = %e, "Failed to save password");
        }
    }
    Ok(grant)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config();
    let username = cli
        .username
        .clone()
        .or_else(|| config.last_username.clone())
        .map(|u| u.to_lowercase())
        .context("No username given. Pass --username the first time.")?;

    let export = match &cli.command {
        Command::Forget => {
            CredentialStore::delete(&username)?;
            eprintln!("Removed stored password for {}", username);
            return Ok(());
        }
        Command::Inbox => Export::Inbox,
        Command::Messages { peers } => Export::Messages(peers),
    };

    let upstream = upstream_for_run(&config);
    let portal = InboxPortal::new(&upstream).context("Invalid upstream configuration")?;
    let grant = login(&portal, &cli, &username).await?;

    config.last_username = Some(grant.username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    let token = Some(grant.token.as_str());
    let output = match export {
        Export::Inbox => portal
            .inbox(token)
            .await
            .map(|inbox| serde_json::to_string_pretty(&inbox)),
        Export::Messages(peers) => portal
            .messages(token, peers)
            .await
            .map(|threads| serde_json::to_string_pretty(&threads)),
    };
    portal.logout(token);

    match output {
        Ok(json) => println!("{}", json?),
        Err(e) => bail!("{} ({})", e.public_message(), e),
    }
    Ok(())
}
