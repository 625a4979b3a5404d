//! Admin console routes
//!
//! Video catalog management (cloud upload, YouTube links, deletion), like
//! statistics, and user management. Every handler enforces the admin role.

use axum::{
    extract::{Extension, Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use vidvault_shared::{UserId, VideoId};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::videos::VideoSummary;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddYoutubeRequest {
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoMutationResponse {
    pub message: String,
    pub video: VideoSummary,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AdminUserSummary {
    pub id: UserId,
    pub email: String,
    pub role: String,
    pub ip: String,
    pub location: String,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct AdminUserRow {
    id: UserId,
    email: String,
    role: String,
    last_ip: Option<String>,
    location: Option<String>,
}

#[derive(Debug, FromRow)]
struct VideoMediaRow {
    media_id: Option<String>,
}

#[derive(Debug, FromRow)]
struct LikeCountRow {
    video_id: String,
    likes: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Upload a video file to the media host and catalog it
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoMutationResponse>> {
    auth_user.require_admin()?;

    let mut title: Option<String> = None;
    let mut file: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("video") => {
                let filename = field
                    .file_name()
                    .unwrap_or("video.mp4")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file field: {}", e)))?;
                file = Some((data.to_vec(), filename));
            }
            Some("title") => {
                title = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (data, filename) = file.ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;

    let uploaded = state
        .media
        .upload_video(data, &filename)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "upload_video: Media host upload failed");
            ApiError::Internal
        })?;

    let video = insert_video(
        &state,
        title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled Video"),
        &uploaded.secure_url,
        Some(&uploaded.public_id),
    )
    .await?;

    tracing::info!(video_id = %video.id, "upload_video: Video uploaded");

    Ok(Json(VideoMutationResponse {
        message: "Video uploaded".to_string(),
        video,
    }))
}

/// Catalog a YouTube video by URL
pub async fn add_youtube_video(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<AddYoutubeRequest>,
) -> ApiResult<Json<VideoMutationResponse>> {
    auth_user.require_admin()?;

    let url = match req.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => return Err(ApiError::Validation("YouTube URL is required".to_string())),
    };

    if !is_youtube_url(url) {
        return Err(ApiError::Validation("Invalid YouTube URL".to_string()));
    }

    let video = insert_video(
        &state,
        req.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled Video"),
        url,
        None,
    )
    .await?;

    tracing::info!(video_id = %video.id, "add_youtube_video: YouTube video added");

    Ok(Json(VideoMutationResponse {
        message: "YouTube video added".to_string(),
        video,
    }))
}

/// List all videos, newest first
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<VideoSummary>>> {
    auth_user.require_admin()?;

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

/// Delete a video, destroying its cloud asset first when one exists
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(video_id): Path<VideoId>,
) -> ApiResult<Json<MessageResponse>> {
    auth_user.require_admin()?;

    let video: VideoMediaRow = sqlx::query_as("SELECT media_id FROM videos WHERE id = $1")
        .bind(video_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Some(media_id) = video.media_id {
        state.media.destroy_video(&media_id).await.map_err(|e| {
            tracing::error!(video_id = %video_id, error = %e, "delete_video: Media destroy failed");
            ApiError::Internal
        })?;
    }

    sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(&state.pool)
        .await?;

    tracing::info!(video_id = %video_id, "delete_video: Video deleted");

    Ok(Json(MessageResponse {
        message: "Video deleted".to_string(),
    }))
}

/// Like counts per video id
pub async fn video_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<HashMap<String, i64>>> {
    auth_user.require_admin()?;

    let rows: Vec<LikeCountRow> = sqlx::query_as(
        r#"
        SELECT video_id, COUNT(*) AS likes
        FROM video_likes
        GROUP BY video_id
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let stats = rows.into_iter().map(|r| (r.video_id, r.likes)).collect();
    Ok(Json(stats))
}

/// List all users with their last known origin
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<AdminUserSummary>>> {
    auth_user.require_admin()?;

    let rows: Vec<AdminUserRow> = sqlx::query_as(
        r#"
        SELECT id, email, role, last_ip, location
        FROM users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let users = rows
        .into_iter()
        .map(|u| AdminUserSummary {
            id: u.id,
            email: u.email,
            role: u.role,
            ip: u.last_ip.unwrap_or_else(|| "N/A".to_string()),
            location: u.location.unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect();

    Ok(Json(users))
}

/// Delete a user account
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<MessageResponse>> {
    auth_user.require_admin()?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    tracing::info!(user_id = %user_id, "delete_user: User deleted");

    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}

// =============================================================================
// Helpers
// =============================================================================

async fn insert_video(
    state: &AppState,
    title: &str,
    url: &str,
    media_id: Option<&str>,
) -> Result<VideoSummary, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO videos (id, title, url, media_id, uploaded_by)
        VALUES ($1, $2, $3, $4, 'admin')
        RETURNING id, title, description, url, uploaded_by, created_at
        "#,
    )
    .bind(VideoId::new())
    .bind(title)
    .bind(url)
    .bind(media_id)
    .fetch_one(&state.pool)
    .await
}

fn is_youtube_url(raw: &str) -> bool {
    let parsed = match url::Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host_str() {
        Some(host) => {
            let host = host.strip_prefix("www.").unwrap_or(host);
            host == "youtube.com" || host == "youtu.be"
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_urls_accepted() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn test_non_youtube_urls_rejected() {
        assert!(!is_youtube_url("https://vimeo.com/12345"));
        assert!(!is_youtube_url("https://youtube.com.evil.example/watch"));
        assert!(!is_youtube_url("ftp://youtube.com/watch"));
        assert!(!is_youtube_url("not a url"));
        assert!(!is_youtube_url(""));
    }
}
