//! Error types for the review service.

use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Startup configuration errors. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is unset or empty
    #[error("environment variable {0} is required")]
    MissingEnv(&'static str),

    /// An identifier did not parse as a positive 64-bit integer
    #[error("invalid {field}: {value:?} is not a positive integer")]
    InvalidId { field: &'static str, value: String },

    /// Private key file does not exist
    #[error("private key file not found at {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Private key file exists but could not be read
    #[error("error reading private key {}: {source}", .path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Private key contents are not a valid RSA PEM key
    #[error("error parsing private key {}: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The JWT signing primitive failed on an otherwise valid key.
#[derive(Debug, Error)]
#[error("error signing JWT: {0}")]
pub struct SigningError(#[from] pub jsonwebtoken::errors::Error);

/// App-authenticated call an [`AuthError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    /// `POST /app/installations/{id}/access_tokens`
    CreateAccessToken { installation_id: u64 },
    /// `GET /app/installations`
    ListInstallations { app_id: u64 },
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateAccessToken { installation_id } => {
                write!(f, "creating access token for installation {installation_id}")
            }
            Self::ListInstallations { app_id } => {
                write!(f, "listing installations of app {app_id}")
            }
        }
    }
}

/// Failures while authenticating against the GitHub App endpoints.
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT could not be minted
    #[error("{operation} failed: {source}")]
    Signing {
        operation: AuthOperation,
        #[source]
        source: SigningError,
    },

    /// Request never produced a response
    #[error("{operation} failed: {source}")]
    Request {
        operation: AuthOperation,
        #[source]
        source: reqwest::Error,
    },

    /// GitHub answered with a non-success status
    #[error("{operation} failed: HTTP {status}: {body}")]
    Status {
        operation: AuthOperation,
        status: StatusCode,
        body: String,
    },

    /// Response body did not match the expected schema
    #[error("{operation} returned an unexpected body: {source}")]
    Decode {
        operation: AuthOperation,
        #[source]
        source: reqwest::Error,
    },

    /// Access token is not usable as a header value
    #[error("installation token for {installation_id} is not a valid header value")]
    InvalidToken { installation_id: u64 },

    /// Installation-scoped HTTP client could not be built
    #[error("failed to build installation client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failures of installation-authenticated GitHub API calls.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP request failed
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status
    #[error("GitHub API error: {status} - {body}")]
    Status { status: StatusCode, body: String },
}

/// Failures talking to the Anthropic Messages API.
#[derive(Debug, Error)]
pub enum ClaudeError {
    /// HTTP request failed
    #[error("Claude request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status
    #[error("Claude API error (status {status}): {body}")]
    Status { status: StatusCode, body: String },

    /// Response body did not match the expected schema
    #[error("error decoding Claude response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response carried no text block
    #[error("Claude response contained no text content")]
    EmptyResponse,

    /// API key is not usable as a header value
    #[error("CLAUDE_API_KEY is not a valid header value")]
    InvalidApiKey,
}

/// A single pull request review that could not be completed.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("failed to get GitHub client: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("failed to get review from Claude: {0}")]
    Claude(#[from] ClaudeError),
}
