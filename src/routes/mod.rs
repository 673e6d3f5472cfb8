//! API routes

mod dashboard;

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use crate::conversation::VisitorMeta;
use crate::core::{ChatError, ChatRequest, StoreError};
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Error surfaced to API clients as `{ "success": false, "error": ... }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Storage failure: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::MessageRequired => {
                Self::new(StatusCode::BAD_REQUEST, ChatError::MessageRequired.to_string())
            }
            ChatError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatReply {
    success: bool,
    response: String,
    session_id: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected chat payload: {}", rejection);
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid JSON")
    })?;

    let meta = visitor_meta(&headers, peer.map(|ConnectInfo(addr)| addr));
    let reply = state.chat_engine.chat(request, meta).await?;

    Ok(Json(ChatReply {
        success: true,
        response: reply.response,
        session_id: reply.session_id,
    }))
}

fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Referer, user agent and client IP for a new conversation
fn visitor_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> VisitorMeta {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty());

    VisitorMeta {
        page_url: header_str(headers, header::REFERER),
        user_agent: header_str(headers, header::USER_AGENT),
        ip_address: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/", post(chat))
        .nest("/api/dashboard", dashboard::router())
}
