//! User profile and balance routes

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::videos::{history_for, likes_for, LikedVideo, WatchedVideo};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub last_ip: Option<String>,
    pub location: Option<String>,
    pub likes: Vec<LikedVideo>,
    pub history: Vec<WatchedVideo>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub balance: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct ProfileRow {
    email: String,
    last_ip: Option<String>,
    location: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// The caller's profile: email, last seen origin, likes and history
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<MeResponse>> {
    let user_id = auth_user.require_user_id()?;

    let profile: ProfileRow =
        sqlx::query_as("SELECT email, last_ip, location FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(ApiError::NotFound)?;

    let likes = likes_for(&state, user_id).await?;
    let history = history_for(&state, user_id).await?;

    Ok(Json(MeResponse {
        email: profile.email,
        last_ip: profile.last_ip,
        location: profile.location,
        likes,
        history,
    }))
}

/// Read the caller's balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<BalanceResponse>> {
    let user_id = auth_user.require_user_id()?;

    let balance: f64 = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(BalanceResponse { balance }))
}

/// Overwrite the caller's balance
pub async fn update_balance(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<UpdateBalanceRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = auth_user.require_user_id()?;

    let balance = match req.balance {
        Some(balance) if balance.is_finite() => balance,
        _ => return Err(ApiError::Validation("balance required".to_string())),
    };

    sqlx::query("UPDATE users SET balance = $1, updated_at = NOW() WHERE id = $2")
        .bind(balance)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Request a withdrawal: zero the balance and acknowledge
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<WithdrawResponse>> {
    let user_id = auth_user.require_user_id()?;

    sqlx::query("UPDATE users SET balance = 0, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = %user_id, "withdraw: Withdrawal requested");

    Ok(Json(WithdrawResponse {
        success: true,
        message: "Withdrawal requested".to_string(),
    }))
}
