//! Pull request review workflow.

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::claude::ClaudeClient;
use crate::error::ReviewError;
use crate::github::{AppAuth, PullRequestTarget};

/// Something that can review a pull request.
///
/// The webhook handler depends on this trait rather than on [`Reviewer`] so
/// that dispatch can be exercised without network access.
#[async_trait]
pub trait ReviewDispatcher: Send + Sync {
    /// Review one pull request end to end.
    async fn review(&self, target: PullRequestTarget) -> Result<(), ReviewError>;
}

/// Fetches a PR diff, has Claude review it and posts the result.
#[derive(Debug, Clone)]
pub struct Reviewer {
    auth: AppAuth,
    claude: ClaudeClient,
}

impl Reviewer {
    #[must_use]
    pub fn new(auth: AppAuth, claude: ClaudeClient) -> Self {
        Self { auth, claude }
    }

    /// Run the review workflow for a single pull request.
    ///
    /// One installation client is minted per call and reused for both the
    /// diff fetch and the review post.
    ///
    /// # Errors
    /// Returns the first failing step; nothing is retried.
    #[instrument(skip(self), fields(pr = %target))]
    pub async fn review_pull_request(&self, target: &PullRequestTarget) -> Result<(), ReviewError> {
        let PullRequestTarget {
            owner,
            repo,
            number,
        } = target;
        info!("Processing pull request");

        let github = self.auth.installation_client().await.map_err(|e| {
            error!(error = %e, "Failed to get GitHub client");
            e
        })?;

        let diff = github
            .pull_request_diff(owner, repo, *number)
            .await
            .map_err(|e| {
                error!(error = %e, pr = *number, "Failed to get PR diff");
                e
            })?;

        info!(pr = *number, "Requesting review from Claude");
        let review = self.claude.review_diff(&diff).await.map_err(|e| {
            error!(error = %e, pr = *number, "Failed to get review from Claude");
            e
        })?;

        info!(pr = *number, "Submitting review to GitHub");
        github
            .create_review(owner, repo, *number, &review)
            .await
            .map_err(|e| {
                error!(error = %e, pr = *number, "Failed to create PR review");
                e
            })?;

        info!(pr = *number, "Successfully submitted review");
        Ok(())
    }
}

#[async_trait]
impl ReviewDispatcher for Reviewer {
    async fn review(&self, target: PullRequestTarget) -> Result<(), ReviewError> {
        self.review_pull_request(&target).await
    }
}
