//! Review bot binary.
//!
//! Serves the GitHub webhook endpoint, or lists the App's installations.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_bot::{server, AppAuth, ClaudeClient, Config, GitHubAppConfig, Reviewer};

#[derive(Parser, Debug)]
#[command(name = "review-bot", version, about = "GitHub App that reviews pull requests with Claude")]
struct Cli {
    /// Print the App's installations and exit
    #[arg(long)]
    list_installations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("review_bot=info".parse()?))
        .init();

    let cli = Cli::parse();

    if dotenvy::dotenv().is_err() {
        warn!(".env file not found, using environment variables");
    }

    if cli.list_installations {
        return list_installations().await;
    }

    serve().await
}

async fn list_installations() -> Result<()> {
    let github = GitHubAppConfig::from_env()?;
    let auth = AppAuth::new(&github).context("Error initializing GitHub App auth")?;

    let installations = auth
        .list_installations()
        .await
        .context("Error getting installations")?;

    println!("GitHub App Installations:");
    for installation in &installations {
        println!(
            "- ID: {}, Account: {}",
            installation.id,
            installation.account_login()
        );
    }
    Ok(())
}

async fn serve() -> Result<()> {
    info!("Starting review bot...");

    let config = Config::from_env()?;
    let auth = AppAuth::new(&config.github).context("Error initializing GitHub App auth")?;
    let claude =
        ClaudeClient::new(&config.claude).context("Error initializing Claude client")?;

    let state = server::AppState {
        webhook_secret: Arc::from(config.webhook_secret.as_str()),
        app_id: auth.app_id(),
        dispatcher: Arc::new(Reviewer::new(auth, claude)),
    };

    info!(url = %format!("http://localhost:{}/debug", config.port), "Debug URL");
    info!(url = %format!("http://localhost:{}/webhook", config.port), "Webhook URL");

    server::run_server(state, &format!("0.0.0.0:{}", config.port))
        .await
        .context("Server error")
}
