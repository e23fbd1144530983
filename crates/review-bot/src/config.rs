//! Configuration for the review service.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default Anthropic endpoint.
pub const DEFAULT_CLAUDE_API_URL: &str = "https://api.anthropic.com";

/// Default Claude model used for reviews.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Private key location used when `GITHUB_APP_PRIVATE_KEY_PATH` is unset.
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./private-key.pem";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Service configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Webhook signing secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: String,
    /// GitHub App settings.
    pub github: GitHubAppConfig,
    /// Claude API settings.
    pub claude: ClaudeConfig,
}

impl Config {
    /// Load the full serving configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] for the first required variable
    /// that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let github = GitHubAppConfig::from_env()?;
        let claude = ClaudeConfig::from_env()?;
        let webhook_secret = required("WEBHOOK_SECRET")?;

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            webhook_secret,
            github,
            claude,
        })
    }
}

/// GitHub App identity as supplied by the environment.
///
/// Values are kept as raw strings here; [`crate::AppAuth::new`] validates
/// them so that malformed IDs and keys surface as one startup failure.
#[derive(Debug, Clone)]
pub struct GitHubAppConfig {
    /// Registered App ID (`GITHUB_APP_ID`).
    pub app_id: String,
    /// Installation this process acts for (`GITHUB_APP_INSTALLATION_ID`).
    pub installation_id: String,
    /// PEM-encoded RSA private key location.
    pub private_key_path: PathBuf,
    /// REST API base URL.
    pub api_url: String,
    /// Timeout applied to every outbound GitHub request.
    pub timeout: Duration,
}

impl GitHubAppConfig {
    /// Load GitHub App settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the App or installation ID is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_id = required("GITHUB_APP_ID")?;
        let installation_id = required("GITHUB_APP_INSTALLATION_ID")?;

        let private_key_path = env::var("GITHUB_APP_PRIVATE_KEY_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map_or_else(
                || {
                    warn!(
                        path = DEFAULT_PRIVATE_KEY_PATH,
                        "GITHUB_APP_PRIVATE_KEY_PATH not set, using default path"
                    );
                    PathBuf::from(DEFAULT_PRIVATE_KEY_PATH)
                },
                PathBuf::from,
            );

        Ok(Self {
            app_id,
            installation_id,
            private_key_path,
            api_url: env::var("GITHUB_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            timeout: http_timeout(),
        })
    }
}

/// Anthropic Messages API settings.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// API base URL (without `/v1`).
    pub api_url: String,
    /// Model name.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClaudeConfig {
    /// Load Claude settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if `CLAUDE_API_KEY` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required("CLAUDE_API_KEY")?,
            api_url: env::var("CLAUDE_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CLAUDE_API_URL.to_string()),
            model: env::var("CLAUDE_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            max_tokens: env::var("CLAUDE_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4096),
            // LLM reviews of large diffs take longer than plain API calls
            timeout: http_timeout().max(Duration::from_secs(120)),
        })
    }
}

impl fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

fn http_timeout() -> Duration {
    Duration::from_secs(
        env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    )
}
