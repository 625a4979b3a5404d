//! Admin-user chat routes
//!
//! Every conversation has the configured administrator address on one side.
//! Admin-only endpoints enforce the role inside the handler.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "timestamp")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Send a message from the caller to the administrator
pub async fn send_to_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let body = match req.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(body) => body,
        None => return Err(ApiError::Validation("Message is required".to_string())),
    };

    sqlx::query(
        r#"
        INSERT INTO chat_messages (id, sender, recipient, body)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.email())
    .bind(&state.config.admin_email)
    .bind(body)
    .execute(&state.pool)
    .await?;

    Ok(Json(MessageResponse {
        message: "Sent to admin".to_string(),
    }))
}

/// The caller's conversation with the administrator, oldest first
pub async fn my_messages(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let messages =
        conversation(&state, auth_user.email(), &state.config.admin_email).await?;
    Ok(Json(messages))
}

/// All messages addressed to the administrator (admin only)
pub async fn admin_messages(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    auth_user.require_admin()?;

    let messages: Vec<ChatMessage> = sqlx::query_as(
        r#"
        SELECT id, sender, recipient, body, created_at
        FROM chat_messages
        WHERE recipient = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(&state.config.admin_email)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(messages))
}

/// The administrator's conversation with a specific user (admin only)
pub async fn conversation_with(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_email): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    auth_user.require_admin()?;

    let messages = conversation(&state, &user_email, &state.config.admin_email).await?;
    Ok(Json(messages))
}

/// Send a message from the administrator to a specific user (admin only)
pub async fn send_to_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_email): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    auth_user.require_admin()?;

    let body = match req.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(body) => body,
        None => return Err(ApiError::Validation("Message is required".to_string())),
    };

    sqlx::query(
        r#"
        INSERT INTO chat_messages (id, sender, recipient, body)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&state.config.admin_email)
    .bind(&user_email)
    .bind(body)
    .execute(&state.pool)
    .await?;

    Ok(Json(MessageResponse {
        message: "Message sent to user".to_string(),
    }))
}

// =============================================================================
// Shared queries
// =============================================================================

/// Both directions between two addresses, oldest first
async fn conversation(
    state: &AppState,
    a: &str,
    b: &str,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, sender, recipient, body, created_at
        FROM chat_messages
        WHERE (sender = $1 AND recipient = $2) OR (sender = $2 AND recipient = $1)
        ORDER BY created_at ASC
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_all(&state.pool)
    .await
}
