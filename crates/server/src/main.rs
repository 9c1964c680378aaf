//! mailsig entry point.
//!
//! Loads configuration from a TOML file or from the environment, discovers
//! the identity provider, and serves the web application until a shutdown
//! signal arrives.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mailsig_core::config::AppConfig;
use mailsig_core::GraphDirectory;
use mailsig_web::oidc::OidcProvider;
use mailsig_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Email signature generator for Microsoft Entra ID accounts.
#[derive(Parser, Debug)]
#[command(
    name = "mailsig",
    version,
    about = "Generate email signatures from your Entra ID profile"
)]
struct Args {
    /// Path to a TOML configuration file. Without it, settings are read
    /// from environment variables (and a `.env` file if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the listen address, e.g. `127.0.0.1:8080`.
    #[arg(long)]
    listen: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => {
            AppConfig::load_and_resolve(path).context("failed to load configuration file")?
        }
        None => {
            let config =
                AppConfig::from_env().context("failed to read configuration from environment")?;
            config
                .validate()
                .context("configuration validation failed")?;
            config
        }
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    let log_level = args
        .log_level
        .unwrap_or_else(|| config.server.log_level.clone());
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    info!("========================================");
    info!("  mailsig v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    match args.config {
        Some(ref path) => info!("Config file   : {}", path.display()),
        None => info!("Config source : environment"),
    }
    info!("Authority     : {}", config.oidc.authority);
    info!("Client ID     : {}", config.oidc.client_id);
    info!("Redirect URI  : {}", config.oidc.redirect_uri);
    info!("Directory     : {}", config.directory.endpoint);
    info!("Listen        : {}", config.server.listen);
    info!("Log level     : {}", log_level);
    info!("========================================");

    let provider = OidcProvider::discover(&config.oidc)
        .await
        .context("failed to initialize identity provider")?;
    info!("identity provider discovered at {}", config.oidc.issuer_url());

    let directory =
        GraphDirectory::from_config(&config.directory).context("failed to build directory client")?;

    let listen_addr = config.server.listen.clone();
    let server = WebServer::new(config, Arc::new(provider), Arc::new(directory))
        .context("failed to initialize web server")?;

    server
        .start(&listen_addr, signals::wait_for_shutdown())
        .await
        .context("web server error")?;

    info!("mailsig stopped.");
    Ok(())
}
