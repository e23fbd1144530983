//! GitHub App that reviews pull requests with Claude.
//!
//! This crate provides:
//! - GitHub App authentication (JWT minting, installation token exchange)
//! - Webhook signature verification (`X-Hub-Signature-256`)
//! - A Claude Messages API client for review text
//! - The review workflow and the HTTP server that triggers it
//!
//! # Configuration
//!
//! - `GITHUB_APP_ID`, `GITHUB_APP_INSTALLATION_ID`: App identity
//! - `GITHUB_APP_PRIVATE_KEY_PATH`: PEM-encoded RSA key (default `./private-key.pem`)
//! - `WEBHOOK_SECRET`: webhook shared secret
//! - `CLAUDE_API_KEY`: Anthropic API key
//! - `PORT`: listen port (default 8080)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod claude;
pub mod config;
pub mod error;
pub mod github;
pub mod review;
pub mod server;
pub mod webhooks;

pub use claude::ClaudeClient;
pub use config::{ClaudeConfig, Config, GitHubAppConfig};
pub use error::{AuthError, ConfigError, ReviewError, SigningError};
pub use github::{AppAuth, Installation, InstallationClient, PullRequestEvent, PullRequestTarget};
pub use review::{ReviewDispatcher, Reviewer};
pub use webhooks::verify_webhook_signature;
