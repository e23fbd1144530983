//! GitHub REST client authenticated as an App installation.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, instrument};

use super::models::{CreateReviewRequest, InstallationToken};
use super::{base_headers, GITHUB_DIFF};
use crate::error::{AuthError, GitHubError};

/// Username GitHub pairs with installation tokens in basic auth.
pub const ACCESS_TOKEN_USER: &str = "x-access-token";

/// GitHub client whose requests carry an installation access token.
///
/// Built by [`crate::AppAuth::installation_client`]. Every request sends
/// `Authorization: Basic base64("x-access-token:<token>")`. The token is not
/// renewed; once GitHub expires it, calls fail with a `401` status error.
#[derive(Debug, Clone)]
pub struct InstallationClient {
    client: reqwest::Client,
    api_url: String,
    expires_at: Option<DateTime<Utc>>,
}

impl InstallationClient {
    pub(crate) fn new(
        installation_id: u64,
        token: &InstallationToken,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let credentials = STANDARD.encode(format!("{ACCESS_TOKEN_USER}:{}", token.token));
        let mut auth = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|_| AuthError::InvalidToken { installation_id })?;
        auth.set_sensitive(true);

        let mut headers = base_headers();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(AuthError::HttpClient)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            expires_at: token.expires_at,
        })
    }

    /// Expiry GitHub reported for the underlying token.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Start an authenticated request against an API path such as `/installation/repositories`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.api_url))
    }

    /// Fetch the unified diff of a pull request.
    #[instrument(skip(self))]
    pub async fn pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, GitHubError> {
        let response = self
            .request(Method::GET, &format!("/repos/{owner}/{repo}/pulls/{number}"))
            .header(ACCEPT, GITHUB_DIFF)
            .send()
            .await?;

        let diff = check_status(response).await?.text().await?;
        debug!(size = diff.len(), "Fetched pull request diff");
        Ok(diff)
    }

    /// Post a `COMMENT` review on a pull request.
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{owner}/{repo}/pulls/{number}/reviews"),
            )
            .json(&CreateReviewRequest {
                body,
                event: "COMMENT",
            })
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GitHubError::Status { status, body })
}
