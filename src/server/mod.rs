//! HTTP surface
//!
//! `POST /chat` answers a conversation, `GET /health` reports liveness.
//! Errors are returned as `{"detail": "..."}` with the status code of the
//! underlying [`crate::Error`].


use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::chat::{ChatRequest, ChatResponse, ChatService, Mode};
use crate::{Error, Result};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    service: Arc<ChatService>,
    started_at: Instant,
}

impl AppState {
    #[inline]
    pub fn new(service: Arc<ChatService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_ms: u64,
}

/// Error body returned for every failed request
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    #[inline]
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("Request failed with {}: {}", self.status, self.detail);
        }
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Build the router with permissive CORS and request tracing
#[inline]
pub fn router(service: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(service))
}

async fn chat_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<ChatParams>, QueryRejection>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Query(params) = params?;
    let Json(request) = body?;

    let response = state
        .service
        .respond(request.into_messages(), params.mode)
        .await?;
    Ok(Json(response))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_ms: u64::try_from(state.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Bind `addr` and serve until the process is stopped
#[inline]
pub async fn serve(addr: SocketAddr, service: Arc<ChatService>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("Listening on http://{}", local);

    axum::serve(listener, router(service)).await?;
    Ok(())
}
