//! GitHub App authentication and the installation-scoped REST client.

pub mod app_auth;
pub mod client;
pub mod models;

pub use app_auth::AppAuth;
pub use client::InstallationClient;
pub use models::{Installation, InstallationAccount, PullRequestEvent, PullRequestTarget};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

/// Media type GitHub expects on App endpoints.
pub const GITHUB_JSON: &str = "application/vnd.github.v3+json";

/// Media type that makes the pulls endpoint return a unified diff.
pub const GITHUB_DIFF: &str = "application/vnd.github.v3.diff";

const API_VERSION: &str = "2022-11-28";

/// Headers sent on every GitHub request regardless of credentials.
pub(crate) fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("review-bot/", env!("CARGO_PKG_VERSION"))),
    );
    headers
}
