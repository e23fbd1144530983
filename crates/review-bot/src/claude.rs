//! Client for the Anthropic Messages API.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::ClaudeConfig;
use crate::error::ClaudeError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const REVIEW_PROMPT: &str = "\
You are an expert code reviewer examining a GitHub pull request.
Please provide detailed, constructive feedback on this code.
Focus on:

1. Potential bugs, edge cases, or performance issues
2. Code structure and organization
3. Readability and maintainability
4. Security vulnerabilities
5. Adherence to best practices and design patterns

For each issue found, include:
- The exact line numbers
- What the problem is
- Why it's a concern
- A suggested improvement

Here is the diff to review:
";

/// Messages API request body
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// Chat message
#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Messages API response body
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// One block of response content
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API client used to produce review text.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let mut api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ClaudeError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Ask Claude to review a unified diff and return the review text.
    ///
    /// # Errors
    /// Returns error on transport failure, a non-success status, a body that
    /// does not match the Messages schema, or a response without text.
    #[instrument(skip(self, diff), fields(diff_len = diff.len(), model = %self.model))]
    pub async fn review_diff(&self, diff: &str) -> Result<String, ClaudeError> {
        debug!("Preparing pull request review request");

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: format!("{REVIEW_PROMPT}\n{diff}\n"),
            }],
        };

        let url = format!("{}/v1/messages", self.api_url);
        debug!(url = %url, "Sending request to Claude API");
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, response = %body, "Claude API returned error");
            return Err(ClaudeError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let parsed: MessagesResponse = serde_json::from_slice(&bytes)?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or(ClaudeError::EmptyResponse)?;

        debug!(response_length = text.len(), "Parsed Claude API response");
        Ok(text)
    }
}
