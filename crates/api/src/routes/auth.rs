//! Authentication routes
//!
//! Register, email verification, login, and the password reset flow. The
//! login handler owns the decision between the configured administrator
//! branch (claims self-contained in the token) and the stored-user branch.

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;
use vidvault_shared::UserId;

use crate::{
    auth::{hash_password, verify_password, TokenError, TokenManager},
    config::Config,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::client_ip;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResetCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct LoginUserRow {
    id: UserId,
    email: String,
    password_hash: String,
    role: String,
    email_verified: bool,
}

#[derive(Debug, FromRow)]
struct UserEmailRow {
    id: UserId,
    email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let password = req.password.as_deref().filter(|p| !p.is_empty());

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "Email and password required".to_string(),
            ))
        }
    };

    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    let email_lower = email.to_lowercase();

    // Check if email already exists
    let exists: Option<(bool,)> =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email_lower)
            .fetch_optional(&state.pool)
            .await?;

    if exists.map(|r| r.0).unwrap_or(false) {
        return Err(ApiError::EmailAlreadyExists);
    }

    // Hash password
    let password_hash = hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "register: Password hashing failed");
        ApiError::Internal
    })?;

    let user_id = UserId::new();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, display_name)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(&email_lower)
    .bind(&password_hash)
    .bind(req.name.as_deref().unwrap_or(""))
    .execute(&state.pool)
    .await?;

    // Issue the verification token and dispatch the email. Dispatch is
    // load-bearing for registration: a failed send fails the request.
    let token_manager = TokenManager::new(state.pool.clone());
    let verification_token = token_manager
        .issue_verification(user_id, &email_lower)
        .await?;

    state
        .email
        .send_email_verification(&email_lower, &verification_token)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "register: Verification email failed");
            ApiError::Internal
        })?;

    tracing::info!(user_id = %user_id, "register: User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully. Verification email sent.".to_string(),
        }),
    ))
}

/// Verify an email address with the token from the verification email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let token = match req.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return Err(ApiError::Validation("Token required".to_string())),
    };

    let token_manager = TokenManager::new(state.pool.clone());
    let record = token_manager
        .find_valid_verification(token)
        .await
        .map_err(|e| match e {
            TokenError::NotFound | TokenError::Expired => {
                ApiError::BadRequest("Invalid or expired token".to_string())
            }
            TokenError::Database => ApiError::Internal,
        })?;

    let updated = sqlx::query(
        "UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1",
    )
    .bind(record.user_id)
    .execute(&state.pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    // Single-use
    token_manager.consume(record.id).await?;

    tracing::info!(user_id = %record.user_id, "verify_email: Email verified");

    Ok(Json(MessageResponse {
        message: "Email verified".to_string(),
    }))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let password = req.password.as_deref().filter(|p| !p.is_empty());

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "Email and password required".to_string(),
            ))
        }
    };

    // Administrator branch: the configured operator pair, checked directly
    // against config and never against the store
    if admin_credentials_match(&state.config, email, password) {
        let token = state
            .jwt_manager
            .issue_admin(&state.config.admin_email)
            .map_err(|e| {
                tracing::error!(error = %e, "login: Admin session issue failed");
                ApiError::Internal
            })?;

        tracing::info!(email = %state.config.admin_email, "login: Administrator session issued");

        return Ok(Json(LoginResponse {
            token,
            role: "admin".to_string(),
            location: "Admin Access".to_string(),
        }));
    }

    let email_lower = email.to_lowercase();

    let user: LoginUserRow = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, role, email_verified
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email_lower)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| {
        tracing::warn!(email = %email_lower, "login: User not found");
        ApiError::InvalidCredentials
    })?;

    if state.config.require_email_verification && !user.email_verified {
        return Err(ApiError::EmailNotVerified);
    }

    let valid = verify_password(password, &user.password_hash).map_err(|e| {
        tracing::error!(error = ?e, "login: Password verification failed with error");
        ApiError::Internal
    })?;

    if !valid {
        tracing::warn!(user_id = %user.id, "login: Invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    // Derive the caller's network origin and resolve a coarse location.
    // Geolocation is best-effort: a failed lookup degrades to "Unknown".
    let ip = client_ip(&headers, &addr);
    let location = match state.geo.lookup(&ip).await {
        Ok(info) => info.display(),
        Err(e) => {
            tracing::warn!(error = %e, ip = %ip, "login: Geolocation lookup failed");
            "Unknown".to_string()
        }
    };

    sqlx::query("UPDATE users SET last_ip = $1, location = $2, updated_at = NOW() WHERE id = $3")
        .bind(&ip)
        .bind(&location)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    let token = state
        .jwt_manager
        .issue_user(user.id, &user.email)
        .map_err(|e| {
            tracing::error!(error = %e, "login: Session issue failed");
            ApiError::Internal
        })?;

    tracing::info!(user_id = %user.id, location = %location, "login: Login successful");

    Ok(Json(LoginResponse {
        token,
        role: user.role,
        location,
    }))
}

/// Request a password reset code
///
/// The response is identical whether or not the email is registered, so the
/// endpoint cannot be used to enumerate accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = match req.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => email,
        None => return Err(ApiError::Validation("Email is required".to_string())),
    };

    let user: Option<UserEmailRow> = sqlx::query_as("SELECT id, email FROM users WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(&state.pool)
        .await?;

    if let Some(user) = user {
        let token_manager = TokenManager::new(state.pool.clone());
        let code = token_manager.issue_reset_code(user.id, &user.email).await?;

        // Load-bearing: if the code cannot be delivered the request fails
        state
            .email
            .send_reset_code(&user.email, &code)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "forgot_password: Reset email failed");
                ApiError::Internal
            })?;

        tracing::info!(user_id = %user.id, "forgot_password: Reset code issued");
    }

    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset code has been sent.".to_string(),
    }))
}

/// Check a reset code without consuming it
pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyResetCodeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (email, code) = match (
        req.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        req.code.as_deref().filter(|c| !c.is_empty()),
    ) {
        (Some(email), Some(code)) => (email, code),
        _ => return Err(ApiError::Validation("Email and code required".to_string())),
    };

    let token_manager = TokenManager::new(state.pool.clone());
    token_manager
        .find_valid_reset(&email.to_lowercase(), code)
        .await
        .map_err(reset_code_error)?;

    // Dry-run only: consumption happens at the actual reset
    Ok(Json(MessageResponse {
        message: "Code verified successfully".to_string(),
    }))
}

/// Reset the password with a previously issued code
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (email, code, new_password) = match (
        req.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        req.code.as_deref().filter(|c| !c.is_empty()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
    ) {
        (Some(email), Some(code), Some(new_password)) => (email, code, new_password),
        _ => {
            return Err(ApiError::Validation(
                "Email, code and newPassword required".to_string(),
            ))
        }
    };

    let email_lower = email.to_lowercase();

    let token_manager = TokenManager::new(state.pool.clone());
    let record = token_manager
        .find_valid_reset(&email_lower, code)
        .await
        .map_err(reset_code_error)?;

    let user: UserEmailRow = sqlx::query_as("SELECT id, email FROM users WHERE email = $1")
        .bind(&email_lower)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    let password_hash = hash_password(new_password).map_err(|e| {
        tracing::error!(error = %e, "reset_password: Password hashing failed");
        ApiError::Internal
    })?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    // Single-use
    token_manager.consume(record.id).await?;

    tracing::info!(user_id = %user.id, "reset_password: Password reset");

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}

// =============================================================================
// Helpers
// =============================================================================

/// Compare the supplied credentials against the configured administrator pair.
/// The pair is configured plaintext by design; the comparison is constant-time.
fn admin_credentials_match(config: &Config, email: &str, password: &str) -> bool {
    if config.admin_email.is_empty() || config.admin_password.is_empty() {
        return false;
    }

    let email_ok = email.as_bytes().ct_eq(config.admin_email.as_bytes());
    let password_ok = password.as_bytes().ct_eq(config.admin_password.as_bytes());
    bool::from(email_ok & password_ok)
}

fn reset_code_error(err: TokenError) -> ApiError {
    match err {
        TokenError::NotFound => {
            ApiError::BadRequest("Invalid code or no reset requested".to_string())
        }
        TokenError::Expired => ApiError::BadRequest("Code expired".to_string()),
        TokenError::Database => ApiError::Internal,
    }
}

/// Basic RFC 5321 shape validation
fn is_valid_email(email: &str) -> bool {
    let email = email.trim().to_lowercase();

    // Length checks per RFC 5321
    if email.len() > 254 || email.is_empty() {
        return false;
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    // Local part validation
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    // No leading/trailing/consecutive dots
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    // Domain must have at least one dot and no edge separators
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(admin_email: &str, admin_password: &str) -> Config {
        Config {
            bind_address: "0.0.0.0:5000".to_string(),
            public_url: "http://localhost:5000".to_string(),
            database_url: "postgres://test".to_string(),
            database_max_connections: 5,
            jwt_secret: "test-jwt-secret-must-be-at-least-32-characters".to_string(),
            session_ttl_days: 7,
            admin_email: admin_email.to_string(),
            admin_password: admin_password.to_string(),
            require_email_verification: false,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email(".leading@x.com"));
        assert!(!is_valid_email("double..dot@x.com"));
        assert!(!is_valid_email("a@.x.com"));
    }

    #[test]
    fn test_admin_credentials_match() {
        let config = test_config("admin@vidvault.dev", "operator-secret");

        assert!(admin_credentials_match(
            &config,
            "admin@vidvault.dev",
            "operator-secret"
        ));
        assert!(!admin_credentials_match(
            &config,
            "admin@vidvault.dev",
            "wrong"
        ));
        assert!(!admin_credentials_match(
            &config,
            "other@vidvault.dev",
            "operator-secret"
        ));
    }

    #[test]
    fn test_unconfigured_admin_never_matches() {
        let config = test_config("", "");
        // Empty supplied values must not match an unconfigured pair
        assert!(!admin_credentials_match(&config, "", ""));
    }
}
