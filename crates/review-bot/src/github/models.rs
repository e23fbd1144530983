//! GitHub API and webhook payload types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binding of the App to an account.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Installation {
    /// Installation ID
    pub id: u64,
    /// Account the App is installed on
    #[serde(default)]
    pub account: Option<InstallationAccount>,
}

impl Installation {
    /// Login of the owning account, falling back to the enterprise slug.
    /// Empty if GitHub sent neither.
    #[must_use]
    pub fn account_login(&self) -> &str {
        self.account
            .as_ref()
            .and_then(|a| a.login.as_deref().or(a.slug.as_deref()))
            .unwrap_or("")
    }
}

/// Owner of an installation: a user, organization or enterprise.
///
/// Enterprise accounts carry `slug` and `name` instead of `login`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstallationAccount {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// GitHub user or organization
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Account {
    /// Login name
    pub login: String,
}

/// Response of `POST /app/installations/{id}/access_tokens`.
#[derive(Clone, Deserialize)]
pub struct InstallationToken {
    /// Opaque token value
    pub token: String,
    /// Expiry chosen by GitHub (about an hour)
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// JWT claims GitHub expects from an App.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppClaims {
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// App ID as a string
    pub iss: String,
}

/// Request body for `POST /repos/{owner}/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateReviewRequest<'a> {
    pub body: &'a str,
    pub event: &'static str,
}

// =========================================================================
// Webhook payloads
// =========================================================================

/// GitHub `pull_request` event payload (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type (opened, synchronize, closed, ...)
    pub action: String,
    /// Pull request details
    pub pull_request: PullRequest,
    /// Repository info
    pub repository: Repository,
}

/// GitHub Pull Request
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    #[serde(default)]
    pub title: String,
    /// PR HTML URL
    #[serde(default)]
    pub html_url: String,
}

/// GitHub Repository
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Full name (owner/repo)
    pub full_name: String,
    /// Owning account
    pub owner: Account,
}

impl PullRequestEvent {
    /// Whether this action should trigger a review.
    #[must_use]
    pub fn is_reviewable(&self) -> bool {
        matches!(self.action.as_str(), "opened" | "synchronize")
    }

    /// The pull request this event refers to.
    #[must_use]
    pub fn target(&self) -> PullRequestTarget {
        PullRequestTarget {
            owner: self.repository.owner.login.clone(),
            repo: self.repository.name.clone(),
            number: self.pull_request.number,
        }
    }
}

/// Coordinates of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for PullRequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pull_request_event() {
        let json = r#"{
            "action": "opened",
            "number": 7,
            "pull_request": {
                "number": 7,
                "title": "Add feature",
                "html_url": "https://github.com/octo/widgets/pull/7",
                "state": "open"
            },
            "repository": {
                "id": 1,
                "name": "widgets",
                "full_name": "octo/widgets",
                "owner": { "login": "octo", "id": 2 }
            }
        }"#;

        let event: PullRequestEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_reviewable());
        assert_eq!(
            event.target(),
            PullRequestTarget {
                owner: "octo".to_string(),
                repo: "widgets".to_string(),
                number: 7,
            }
        );
        assert_eq!(event.target().to_string(), "octo/widgets#7");
    }

    #[test]
    fn test_only_opened_and_synchronize_are_reviewable() {
        let mut event: PullRequestEvent = serde_json::from_value(serde_json::json!({
            "action": "synchronize",
            "pull_request": { "number": 1 },
            "repository": {
                "name": "r",
                "full_name": "o/r",
                "owner": { "login": "o" }
            }
        }))
        .unwrap();
        assert!(event.is_reviewable());

        for action in ["closed", "edited", "labeled", "reopened"] {
            event.action = action.to_string();
            assert!(!event.is_reviewable(), "{action} should be ignored");
        }
    }

    #[test]
    fn test_installation_account_login() {
        let with_account: Installation =
            serde_json::from_str(r#"{"id": 42, "account": {"login": "octo"}}"#).unwrap();
        assert_eq!(with_account.account_login(), "octo");

        let without_account: Installation = serde_json::from_str(r#"{"id": 43}"#).unwrap();
        assert_eq!(without_account.account_login(), "");

        let enterprise: Installation = serde_json::from_str(
            r#"{"id": 44, "account": {"slug": "big-corp", "name": "Big Corp"}}"#,
        )
        .unwrap();
        assert_eq!(enterprise.account_login(), "big-corp");

        let bare_account: Installation =
            serde_json::from_str(r#"{"id": 45, "account": {"id": 9}}"#).unwrap();
        assert_eq!(bare_account.account_login(), "");
    }

    #[test]
    fn test_installation_token_debug_redacts_token() {
        let token: InstallationToken = serde_json::from_str(
            r#"{"token": "ghs_secret", "expires_at": "2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(token.token, "ghs_secret");
        assert!(token.expires_at.is_some());
        assert!(!format!("{token:?}").contains("ghs_secret"));
    }
}
