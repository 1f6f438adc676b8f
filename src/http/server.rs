//! HTTP front-end: Slack events, a generic message hook, and a health check.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use super::slack::{SlackAction, SlackClient, SlackEnvelope, classify};
use crate::domain::{CommandRequest, SourceRole};
use crate::error::{BridgeError, Result};
use crate::ports::ChatHandler;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn ChatHandler>,
    pub slack: Arc<SlackClient>,
    pub start_time: Instant,
    api_token: Option<Arc<Zeroizing<String>>>,
}

impl AppState {
    #[must_use]
    pub fn new(handler: Arc<dyn ChatHandler>, slack: SlackClient) -> Self {
        Self {
            handler,
            slack: Arc::new(slack),
            start_time: Instant::now(),
            api_token: None,
        }
    }

    /// Require `Authorization: Bearer <token>` on `POST /api/messages`
    #[must_use]
    pub fn with_api_token(mut self, token: Option<Zeroizing<String>>) -> Self {
        self.api_token = token.map(Arc::new);
        self
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.api_token else {
            return true;
        };
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        provided.is_some_and(|p| bool::from(expected.as_bytes().ct_eq(p.trim().as_bytes())))
    }
}

/// Body of `POST /api/messages`
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(default)]
    pub role: SourceRole,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub reply: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/messages", post(messages))
        .route("/api/slack/events", post(slack_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api/health`: liveness check
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

/// `POST /api/messages`: dispatch one message and return the reply inline
///
/// Answers 401 without dispatching when an API token is configured and the
/// request does not carry it.
async fn messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MessageRequest>,
) -> Response {
    if !state.authorized(&headers) {
        warn!("Rejected /api/messages request with missing or wrong token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Missing or invalid Authorization header"})),
        )
            .into_response();
    }

    let reply = state
        .handler
        .handle(CommandRequest::new(body.text, body.role))
        .await;
    Json(MessageResponse { reply }).into_response()
}

/// `POST /api/slack/events`: always answers 200
///
/// Commands run in a background task and their reply is posted to the
/// conversation once ready.
async fn slack_events(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope: SlackEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed Slack payload");
            return StatusCode::OK.into_response();
        }
    };

    match classify(envelope) {
        SlackAction::Challenge(challenge) => (StatusCode::OK, challenge).into_response(),
        SlackAction::Dispatch { channel, request } => {
            info!(channel = %channel, "Slack direct message received");
            tokio::spawn(async move {
                let Some(reply) = state.handler.handle(request).await else {
                    return;
                };
                if let Err(e) = state.slack.post_message(&channel, &reply).await {
                    error!(channel = %channel, error = %e, "Error posting to Slack");
                }
            });
            StatusCode::OK.into_response()
        }
        SlackAction::Ignore => StatusCode::OK.into_response(),
    }
}

/// Bind `addr` and serve until SIGINT or SIGTERM
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BridgeError::Http {
            reason: format!("Server error: {e}"),
        })?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c.await.ok();
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT");
    }
}
