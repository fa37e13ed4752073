//! Webhook HTTP boundary for the Reverb engine.
//!
//! Verifies the platform signature over the raw body before any event
//! reaches the core, then hands the batch to the webhook processor.
//! Per-event errors surface in the response's `errors` array; the call
//! itself stays 200 so the platform never retries a half-processed batch.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reverb_core::current_unix_timestamp_ms;
use reverb_engine::{render_webhook_batch_report, WebhookProcessor};
use reverb_gateway::{verify_webhook_signature, WEBHOOK_SIGNATURE_HEADER};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Public struct `AppState` shared by the webhook routes.
pub struct AppState {
    pub account_id: String,
    pub channel_secret: String,
    pub processor: WebhookProcessor,
}

#[derive(Debug, Clone)]
/// Public struct `ServerConfig` for the webhook listener.
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize)]
struct WebhookRequestBody {
    events: Vec<Value>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/healthz", get(handle_healthz))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig, state: Arc<AppState>) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound webhook server address")?;
    tracing::info!(
        addr = %local_addr,
        account_id = state.account_id.as_str(),
        "webhook server listening"
    );

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook server exited unexpectedly")
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return error_response(StatusCode::UNAUTHORIZED, "missing signature");
    };
    if verify_webhook_signature(&state.channel_secret, &body, signature).is_err() {
        return error_response(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let Ok(payload) = serde_json::from_slice::<WebhookRequestBody>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid payload format");
    };

    match state
        .processor
        .process(&state.account_id, &payload.events)
        .await
    {
        Ok(report) => {
            tracing::info!("{}", render_webhook_batch_report(&report));
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "webhook batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "webhook processing failed")
        }
    }
}

async fn handle_healthz() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp_unix_ms": current_unix_timestamp_ms(),
        })),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
