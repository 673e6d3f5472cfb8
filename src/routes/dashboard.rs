//! Staff dashboard endpoints for chat conversations

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conversation::{ConversationDetail, ConversationSummary};
use crate::core::{ConversationFilter, Page};
use crate::AppState;

use super::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub leads: Option<String>,
    #[serde(default)]
    pub resolved: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl ListQuery {
    /// Anything other than the literal "true"/"false" means no filter
    fn filter(&self) -> ConversationFilter {
        ConversationFilter {
            leads_only: self.leads.as_deref() == Some("true"),
            resolved: match self.resolved.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
        }
    }

    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub admin_notes: String,
    #[serde(default)]
    pub visitor_name: String,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    #[serde(flatten)]
    page: Page<ConversationSummary>,
}

#[derive(Debug, Serialize)]
struct DetailResponse {
    success: bool,
    chat: ConversationDetail,
}

async fn list_chats(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let page = state
        .chat_engine
        .store()
        .list(query.filter(), query.page())
        .await?;

    Ok(Json(ListResponse {
        success: true,
        page,
    }))
}

async fn chat_detail(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DetailResponse>, ApiError> {
    let id = conversation_id(id)?;
    let chat = state
        .chat_engine
        .store()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("conversation"))?;

    Ok(Json(DetailResponse {
        success: true,
        chat,
    }))
}

fn conversation_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid conversation id"))
}

fn done(found: bool, message: &str) -> Result<Json<Value>, ApiError> {
    if !found {
        return Err(ApiError::not_found("conversation"));
    }
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn mark_lead(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = conversation_id(id)?;
    let found = state.chat_engine.store().mark_lead(id).await?;
    done(found, "Marked as lead.")
}

async fn mark_resolved(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = conversation_id(id)?;
    let found = state.chat_engine.store().mark_resolved(id).await?;
    done(found, "Marked as resolved.")
}

async fn save_notes(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    notes: Result<Json<NotesRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = conversation_id(id)?;
    let Json(notes) = notes.map_err(|rejection| {
        tracing::debug!("Rejected notes payload: {}", rejection);
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid JSON")
    })?;

    let found = state
        .chat_engine
        .store()
        .save_notes(id, &notes.admin_notes, &notes.visitor_name)
        .await?;
    done(found, "Notes saved.")
}

async fn delete_chat(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = conversation_id(id)?;
    let found = state.chat_engine.store().delete(id).await?;
    if found {
        tracing::info!(conversation_id = id, "Deleted chat conversation");
    }
    done(found, "Chat conversation deleted.")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats))
        .route("/chats/:id", get(chat_detail).delete(delete_chat))
        .route("/chats/:id/lead", post(mark_lead))
        .route("/chats/:id/resolve", post(mark_resolved))
        .route("/chats/:id/notes", post(save_notes))
}
