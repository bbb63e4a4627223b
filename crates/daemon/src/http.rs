// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional HTTP control surface (spec section 5): `GET /health`,
//! `POST /api/config/update`, `POST /api/shutdown`. The teacher carries no
//! HTTP framework of its own; this is grounded on the `tftio-gator` example
//! pack member's `axum` + `tower-http` control-surface shape instead.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

struct ApiError(poppo_core::PoppoError);

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.kind {
            poppo_core::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            poppo_core::ErrorKind::InvalidConfig | poppo_core::ErrorKind::AlreadyExists => StatusCode::BAD_REQUEST,
            poppo_core::ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.message, "kind": format!("{:?}", self.0.kind) }))).into_response()
    }
}

impl From<poppo_core::PoppoError> for ApiError {
    fn from(err: poppo_core::PoppoError) -> Self {
        Self(err)
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/config/update", post(config_update))
        .route("/api/shutdown", post(shutdown))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": if state.is_shutting_down() { "shutting_down" } else { "ok" },
        "uptime_ms": state.uptime_ms(),
    }))
}

async fn config_update(State(state): State<Arc<AppState>>, Json(patch): Json<Value>) -> Result<Json<Value>, ApiError> {
    state.config.update(&patch)?;
    Ok(Json(state.config.export()?))
}

async fn shutdown(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.begin_shutdown();
    Json(json!({ "accepted": true }))
}

/// Serve until `shutdown` fires. A bind failure here is non-fatal: the HTTP
/// surface is explicitly optional (spec section 5), the Unix socket is not.
pub async fn serve(host: &str, port: u16, state: Arc<AppState>, shutdown: tokio_util::sync::CancellationToken) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http control surface listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
