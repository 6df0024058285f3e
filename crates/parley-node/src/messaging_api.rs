//! # Messaging API
//!
//! HTTP endpoints for support conversations.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/messages` | Send a message (opens a conversation for customers) |
//! | GET | `/api/conversations?userId&isAdmin` | List conversations |
//! | GET | `/api/conversations/{id}?userId` | One conversation |
//! | GET | `/api/conversations/{id}/messages?page&limit` | Paginated messages, oldest first |
//! | POST | `/api/conversations/{id}/read` | Mark customer messages read (staff) |
//! | POST | `/api/realtime/auth` | Issue a realtime capability grant |
//! | POST | `/api/customers` | Register a customer (customer role only) |
//! | POST | `/api/support/guest-message` | Support message from a guest |
//! | GET | `/api/admin/conversations/stats?userId` | Dashboard counters (staff) |
//! | GET | `/api/admin/staff?userId` | Staff directory (staff) |
//!
//! ## Example: Sending a Message
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/messages \
//!   -H "Content-Type: application/json" \
//!   -d '{"senderId": "cust_1", "content": "Where is my order?"}'
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parley_messaging::{GuestMessage, SendMessage};
use parley_store::NewCustomer;
use parley_types::{MessageKind, Role};
use serde::Deserialize;

use crate::api::{ApiError, AppState};
use crate::validation::{
    validate_content, validate_email, validate_identifier, validate_optional_identifier,
    validate_page, FieldChecks,
};

/// Creates the messaging API routes.
pub fn messaging_routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/{id}", get(get_conversation))
        .route("/api/conversations/{id}/messages", get(list_messages))
        .route("/api/conversations/{id}/read", post(mark_read))
        .route("/api/realtime/auth", post(authorize_realtime))
        .route("/api/customers", post(register_customer))
        .route("/api/support/guest-message", post(guest_message))
        .route("/api/admin/conversations/stats", get(conversation_stats))
        .route("/api/admin/staff", get(list_staff))
}

// ==================== Request Types ====================

/// Body of `POST /api/messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub sender_id: String,
    pub conversation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub metadata: Option<serde_json::Value>,
}

/// Query for `GET /api/conversations`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationsQuery {
    pub user_id: String,
    pub is_admin: bool,
}

/// Query carrying only the acting user.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

/// Pagination query shared by message listings.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// When present, the thread must be visible to this user.
    pub user_id: Option<String>,
}

/// Body carrying only the acting user.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: String,
}

/// Body of `POST /api/realtime/auth`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RealtimeAuthRequest {
    pub user_id: String,
    pub user_role: Option<String>,
}

/// Body of `POST /api/customers`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

/// Body of `POST /api/support/guest-message`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuestMessageRequest {
    pub guest_id: String,
    pub content: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl PageQuery {
    /// Resolve defaults and validate against the configured bounds.
    pub(crate) fn resolve(&self, state: &AppState) -> Result<(usize, usize), ApiError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(state.config.default_page_size);
        FieldChecks::new()
            .check(
                "page",
                validate_page(page, limit, state.config.max_page_size),
            )
            .finish()?;
        Ok((page, limit))
    }
}

// ==================== Handlers ====================

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("content", validate_content(&req.content))
        .check("senderId", validate_identifier(&req.sender_id))
        .check(
            "conversationId",
            validate_optional_identifier(req.conversation_id.as_deref()),
        )
        .finish()?;

    let view = state.messenger.send_message(SendMessage {
        content: req.content,
        sender_id: req.sender_id,
        conversation_id: req.conversation_id,
        kind: req.kind,
        metadata: req.metadata,
    })?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&query.user_id))
        .finish()?;

    let conversations = state
        .messenger
        .list_conversations(&query.user_id, query.is_admin)?;
    Ok(Json(conversations))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&query.user_id))
        .finish()?;

    let summary = state.messenger.conversation(&query.user_id, &id)?;
    Ok(Json(summary))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = query.resolve(&state)?;

    if let Some(user_id) = query.user_id.as_deref() {
        state.messenger.conversation(user_id, &id)?;
    }

    let messages = state.messenger.list_messages(&id, page, limit)?;
    Ok(Json(messages))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&req.user_id))
        .finish()?;

    let updated = state.messenger.mark_read(&id, &req.user_id)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "updated": updated,
    })))
}

async fn authorize_realtime(
    State(state): State<AppState>,
    Json(req): Json<RealtimeAuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&req.user_id))
        .finish()?;

    let grant = state
        .messenger
        .authorize(&req.user_id, req.user_role.as_deref())?;
    Ok(Json(grant))
}

async fn register_customer(
    State(state): State<AppState>,
    Json(req): Json<RegisterCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("email", validate_email(&req.email))
        .check("id", validate_optional_identifier(req.id.as_deref()))
        .finish()?;

    // Staff accounts come only from the configured seed.
    if req.role.is_staff() {
        return Err(ApiError::Forbidden(format!(
            "Cannot self-register with role {}",
            req.role
        )));
    }

    let customer = state.messenger.register_customer(NewCustomer {
        id: req.id,
        name: req.name,
        email: req.email,
        avatar: req.avatar,
        role: Role::Customer,
    })?;

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn guest_message(
    State(state): State<AppState>,
    Json(req): Json<GuestMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("guestId", validate_identifier(&req.guest_id))
        .check("content", validate_content(&req.content))
        .finish()?;

    let view = state.messenger.guest_support_message(GuestMessage {
        guest_id: req.guest_id,
        content: req.content,
        name: req.name,
        email: req.email,
    })?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn conversation_stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&query.user_id))
        .finish()?;

    Ok(Json(state.messenger.stats(&query.user_id)?))
}

async fn list_staff(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    FieldChecks::new()
        .check("userId", validate_identifier(&query.user_id))
        .finish()?;

    Ok(Json(state.messenger.staff(&query.user_id)?))
}
