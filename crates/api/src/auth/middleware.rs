//! Request authentication middleware
//!
//! Extracts and verifies the bearer token, resolves the claimed identity, and
//! attaches it to the request as an [`AuthUser`] extension. The administrator
//! claim is self-contained in the token and resolves without a store lookup.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::FromRow;

use crate::{auth::jwt::Claims, error::ApiError, state::AppState};
use vidvault_shared::UserId;

/// The identity attached to an authenticated request
#[derive(Debug, Clone)]
pub enum AuthUser {
    /// The configured administrator; exists only in the token
    Admin { email: String },
    /// A stored user record
    User {
        id: UserId,
        email: String,
        role: String,
    },
}

impl AuthUser {
    pub fn email(&self) -> &str {
        match self {
            AuthUser::Admin { email } => email,
            AuthUser::User { email, .. } => email,
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            AuthUser::Admin { .. } => true,
            AuthUser::User { role, .. } => role == "admin",
        }
    }

    /// Gate for admin-only operations
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// The backing user id, for profile-bound operations
    ///
    /// The administrator context has no stored record; endpoints that need
    /// one report the missing profile as not-found.
    pub fn require_user_id(&self) -> Result<UserId, ApiError> {
        match self {
            AuthUser::User { id, .. } => Ok(*id),
            AuthUser::Admin { .. } => Err(ApiError::NotFound),
        }
    }
}

#[derive(Debug, FromRow)]
struct AuthUserRow {
    id: UserId,
    email: String,
    role: String,
}

/// Require a valid session token on the request
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt_manager.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "require_auth: Token verification failed");
        ApiError::Unauthorized
    })?;

    let auth_user = match claims {
        Claims::Admin(admin) => AuthUser::Admin { email: admin.email },
        Claims::User(user) => {
            // The claim outlives the record: a deleted user fails here
            let row: AuthUserRow =
                sqlx::query_as("SELECT id, email, role FROM users WHERE id = $1")
                    .bind(user.sub)
                    .fetch_optional(&state.pool)
                    .await?
                    .ok_or_else(|| {
                        tracing::warn!(user_id = %user.sub, "require_auth: User not found");
                        ApiError::Unauthorized
                    })?;

            AuthUser::User {
                id: row.id,
                email: row.email,
                role: row.role,
            }
        }
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_context_is_admin() {
        let admin = AuthUser::Admin {
            email: "admin@example.com".to_string(),
        };
        assert!(admin.is_admin());
        assert!(admin.require_admin().is_ok());
        assert!(matches!(admin.require_user_id(), Err(ApiError::NotFound)));
    }

    #[test]
    fn test_plain_user_is_not_admin() {
        let user = AuthUser::User {
            id: UserId::new(),
            email: "a@x.com".to_string(),
            role: "user".to_string(),
        };
        assert!(!user.is_admin());
        assert!(matches!(user.require_admin(), Err(ApiError::Forbidden)));
        assert!(user.require_user_id().is_ok());
    }

    #[test]
    fn test_stored_admin_role_counts() {
        let user = AuthUser::User {
            id: UserId::new(),
            email: "ops@x.com".to_string(),
            role: "admin".to_string(),
        };
        assert!(user.is_admin());
        assert!(user.require_admin().is_ok());
    }
}
