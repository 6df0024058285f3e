//! # Chat API
//!
//! Direct chat rooms: one room per registered customer or guest identity.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/chat` | Resolve or create the caller's room |
//! | POST | `/api/chat/guest` | Guest bootstrap, returns `{userId, roomId}` |
//! | POST | `/api/chat/{roomId}` | Send a chat message |
//! | GET | `/api/chat/{roomId}?page&limit&userId` | Paginated chat messages, oldest first |
//!
//! Chat messages are published on `chat-room:{roomId}` only; they never reach
//! the support topics.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::{ApiError, AppState};
use crate::messaging_api::{PageQuery, UserRequest};
use crate::validation::{validate_content, validate_identifier, FieldChecks};

/// Creates the chat API routes.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(open_chat))
        .route("/api/chat/guest", post(guest_chat))
        .route(
            "/api/chat/{room_id}",
            post(send_chat_message).get(list_chat_messages),
        )
}

/// Body of `POST /api/chat/guest`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuestChatRequest {
    pub guest_id: String,
}

/// Body of `POST /api/chat/{roomId}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatMessageRequest {
    pub sender_id: String,
    pub message: String,
}

async fn open_chat(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&req.user_id))
        .finish()?;

    Ok(Json(state.messenger.open_chat(&req.user_id)?))
}

async fn guest_chat(
    State(state): State<AppState>,
    Json(req): Json<GuestChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("guestId", validate_identifier(&req.guest_id))
        .finish()?;

    Ok(Json(state.messenger.guest_chat(&req.guest_id)?))
}

async fn send_chat_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("senderId", validate_identifier(&req.sender_id))
        .check("message", validate_content(&req.message))
        .finish()?;

    let view = state
        .messenger
        .send_chat_message(&req.sender_id, &room_id, &req.message)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_chat_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = query.resolve(&state)?;

    if let Some(user_id) = query.user_id.as_deref() {
        state.messenger.chat_room(user_id, &room_id)?;
    }

    Ok(Json(
        state.messenger.list_chat_messages(&room_id, page, limit)?,
    ))
}
