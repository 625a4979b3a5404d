//! Video catalog, likes, and watch history routes

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use vidvault_shared::{UserId, VideoId};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub uploaded_by: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub liked_at: OffsetDateTime,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub watched_at: OffsetDateTime,
}

/// Like outcome - either a fresh like with the updated list, or a no-op
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LikeResponse {
    AlreadyLiked { message: String },
    Liked { success: bool, likes: Vec<LikedVideo> },
}

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub success: bool,
    pub history: Vec<WatchedVideo>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List all videos, newest first
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<VideoSummary>>> {
    let videos: Vec<VideoSummary> = sqlx::query_as(
        r#"
        SELECT id, title, description, url, uploaded_by, created_at
        FROM videos
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(videos))
}

/// Like a video (idempotent per user+video)
pub async fn like_video(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<LikeRequest>,
) -> ApiResult<Json<LikeResponse>> {
    let user_id = auth_user.require_user_id()?;

    let video_id = match req.video_id.as_deref().filter(|v| !v.is_empty()) {
        Some(video_id) => video_id,
        None => return Err(ApiError::Validation("videoId required".to_string())),
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO video_likes (user_id, video_id, title, url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, video_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(video_id)
    .bind(req.title.as_deref().unwrap_or(""))
    .bind(req.url.as_deref().unwrap_or(""))
    .execute(&state.pool)
    .await?;

    if inserted.rows_affected() == 0 {
        return Ok(Json(LikeResponse::AlreadyLiked {
            message: "Already liked".to_string(),
        }));
    }

    tracing::info!(user_id = %user_id, video_id = %video_id, "like_video: Video liked");

    let likes = likes_for(&state, user_id).await?;
    Ok(Json(LikeResponse::Liked {
        success: true,
        likes,
    }))
}

/// Record a watch event (append-only)
pub async fn record_watch(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<WatchRequest>,
) -> ApiResult<Json<WatchResponse>> {
    let user_id = auth_user.require_user_id()?;

    let video_id = match req.video_id.as_deref().filter(|v| !v.is_empty()) {
        Some(video_id) => video_id,
        None => return Err(ApiError::Validation("videoId required".to_string())),
    };

    sqlx::query(
        r#"
        INSERT INTO watch_history (id, user_id, video_id, title, url)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(video_id)
    .bind(req.title.as_deref().unwrap_or(""))
    .bind(req.url.as_deref().unwrap_or(""))
    .execute(&state.pool)
    .await?;

    let history = history_for(&state, user_id).await?;
    Ok(Json(WatchResponse {
        success: true,
        history,
    }))
}

// =============================================================================
// Shared queries
// =============================================================================

pub(super) async fn likes_for(
    state: &AppState,
    user_id: UserId,
) -> Result<Vec<LikedVideo>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT video_id, title, url, liked_at
        FROM video_likes
        WHERE user_id = $1
        ORDER BY liked_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await
}

pub(super) async fn history_for(
    state: &AppState,
    user_id: UserId,
) -> Result<Vec<WatchedVideo>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT video_id, title, url, watched_at
        FROM watch_history
        WHERE user_id = $1
        ORDER BY watched_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await
}
