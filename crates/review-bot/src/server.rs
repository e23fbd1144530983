//! HTTP server for GitHub webhooks.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::github::PullRequestEvent;
use crate::review::ReviewDispatcher;
use crate::webhooks::{verify_webhook_signature, WebhookHeaders};

/// GitHub caps webhook payloads at 25 MB.
const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Webhook signing secret.
    pub webhook_secret: Arc<str>,
    /// GitHub App ID, reported by `/debug`.
    pub app_id: u64,
    /// Runs reviews for accepted pull request events.
    pub dispatcher: Arc<dyn ReviewDispatcher>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(github_webhook_handler))
        .route("/debug", get(debug_handler))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES)),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to bind or stops unexpectedly.
pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Review bot listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Runtime information endpoint.
async fn debug_handler(State(state): State<AppState>) -> Json<Value> {
    debug!("Debug endpoint accessed");
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "app_id": state.app_id.to_string(),
        "webhook_configured": "true",
    }))
}

/// Handle incoming GitHub webhooks.
///
/// The signature is checked before anything in the body is looked at.
/// Accepted pull request events are reviewed on a background task, so the
/// response never waits on GitHub or Claude and never reports their failures.
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let webhook_headers = WebhookHeaders::from_header_map(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    });
    let delivery_id = webhook_headers.delivery_id.as_deref().unwrap_or("unknown");

    info!(delivery_id = %delivery_id, size = body.len(), "Received webhook");

    let signature = webhook_headers.signature.as_deref().unwrap_or_default();
    if signature.is_empty() {
        warn!("Missing X-Hub-Signature-256 header");
    }

    if !verify_webhook_signature(&body, signature, &state.webhook_secret) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let event_type = webhook_headers.event_type.as_deref().unwrap_or("unknown");
    info!(event_type = %event_type, "Processing webhook event");

    match event_type {
        "ping" => {
            info!("Received ping event");
            return (StatusCode::OK, "Pong!").into_response();
        }
        "pull_request" => {}
        _ => {
            info!(event_type = %event_type, "Ignoring non-pull request event");
            return Json(json!({
                "status": "ignored",
                "reason": "not_pull_request_event"
            }))
            .into_response();
        }
    }

    let event: PullRequestEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "Failed to parse webhook");
            return (StatusCode::BAD_REQUEST, "Failed to parse webhook").into_response();
        }
    };

    info!(action = %event.action, "Pull request action");
    if !event.is_reviewable() {
        info!(action = %event.action, "Ignoring pull request action");
        return Json(json!({
            "status": "ignored",
            "reason": "action_not_reviewed"
        }))
        .into_response();
    }

    let target = event.target();
    info!(
        pr = target.number,
        repo = %event.repository.full_name,
        title = %event.pull_request.title,
        url = %event.pull_request.html_url,
        "Queueing pull request review"
    );

    let dispatcher = Arc::clone(&state.dispatcher);
    let task_target = target.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.review(task_target.clone()).await {
            error!(error = %e, pr = %task_target, "Pull request review failed");
        }
    });

    Json(json!({
        "status": "accepted",
        "pr": target.to_string()
    }))
    .into_response()
}
