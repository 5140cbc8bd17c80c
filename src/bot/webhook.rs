//! HTTP ingest for gateway events.
//!
//! - `POST /events` takes one [`GatewayEvent`] and answers with its report
//! - `GET /health` for liveness probes
//!
//! When a secret is configured, requests must carry it in `x-vigil-secret`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::{error, info, warn};

use super::dispatcher::AppState;
use super::runtime::shutdown_signal;
use crate::events::{GatewayEvent, handle_event};

pub const SECRET_HEADER: &str = "x-vigil-secret";

#[derive(Clone)]
pub struct WebhookState {
    app: AppState,
    secret: Option<Arc<str>>,
}

impl WebhookState {
    pub fn new(app: AppState, secret: Option<String>) -> Self {
        Self {
            app,
            secret: secret.map(Into::into),
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(receive_event))
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn start_webhook(port: u16, state: WebhookState) -> anyhow::Result<()> {
    if state.secret.is_some() {
        info!("Webhook secret configured");
    }

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening for events on {}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Webhook server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn receive_event(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = &state.secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_ref()) {
            warn!("Rejected event with missing or wrong secret");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        }
    }

    let event: GatewayEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    match handle_event(&state.app, event).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Event handling failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "internal error" }))).into_response()
        }
    }
}
