//! HTTP transport module for cdc-firefighter
//!
//! Axum server exposing the ask operation on `/ask` and `/perguntar` plus a
//! `/health` liveness probe. Errors are plain JSON `{"detail": ...}` bodies.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::server::{AskRequest, AskResponse, Gateway};

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub gateway: Gateway,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "mcp_url": state.gateway.tool_backend_url()
    }))
}

/// Ask endpoint, mounted on both `/ask` and `/perguntar`
///
/// Body rejections are reported as 400 with the usual `{"detail"}` body.
pub async fn ask_handler(
    State(state): State<HttpState>,
    body: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> std::result::Result<Json<AskResponse>, GatewayError> {
    let Json(body) = body.map_err(|rejection| GatewayError::Validation {
        message: rejection.body_text(),
    })?;
    let span = tracing::info_span!("ask", request_id = %Uuid::new_v4());
    state
        .gateway
        .ask(&body.pergunta)
        .instrument(span)
        .await
        .map(Json)
}

/// Last-resort handler: a panicking request becomes a 500 with the usual body.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Unhandled error while serving request: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": format!("Internal server error: {detail}") })),
    )
        .into_response()
}

pub fn build_router(gateway: Gateway) -> Router {
    let state = HttpState { gateway };
    Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .route("/perguntar", post(ask_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(gateway: Gateway, bind: SocketAddr) -> Result<()> {
    let app = build_router(gateway);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
