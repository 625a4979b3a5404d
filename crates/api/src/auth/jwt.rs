//! Session token generation and validation
//!
//! Sessions are stateless signed JWTs with a fixed validity window. Two claim
//! shapes exist: a normal user claim carrying the user id, and an admin claim
//! carrying only the configured administrator email and role. Which shape is
//! minted is the login flow's decision, not the issuer's.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use vidvault_shared::UserId;

/// Claims for a session backed by a stored user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (user ID)
    pub sub: UserId,
    /// Email
    pub email: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Claims for the configured administrator account (no backing record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Email
    pub email: String,
    /// Always "admin"
    pub role: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Decoded session claims, one variant per shape
///
/// Untagged: an admin token is recognized by its `role` field, a user token
/// by its `sub` field. Admin must be tried first since both carry `email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Claims {
    Admin(AdminClaims),
    User(UserClaims),
}

/// JWT manager for session token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_days: i64,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, session_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl_days,
        }
    }

    /// Issue a session token for a stored user
    pub fn issue_user(&self, user_id: UserId, email: &str) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::days(self.session_ttl_days);

        let claims = UserClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Issue a session token for the configured administrator
    pub fn issue_admin(&self, email: &str) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::days(self.session_ttl_days);

        let claims = AdminClaims {
            email: email.to_string(),
            role: "admin".to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate and decode a session token
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    /// Session validity window in seconds
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_days * 86_400
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-chars!";

    #[test]
    fn test_user_token_roundtrip() {
        let jwt = JwtManager::new(SECRET, 7);
        let user_id = UserId::new();

        let token = jwt
            .issue_user(user_id, "test@example.com")
            .expect("Failed to issue token");

        match jwt.verify(&token).expect("Invalid token") {
            Claims::User(claims) => {
                assert_eq!(claims.sub, user_id);
                assert_eq!(claims.email, "test@example.com");
                assert_eq!(claims.exp - claims.iat, 7 * 86_400);
            }
            Claims::Admin(_) => panic!("user token decoded as admin"),
        }
    }

    #[test]
    fn test_admin_token_roundtrip() {
        let jwt = JwtManager::new(SECRET, 7);

        let token = jwt
            .issue_admin("admin@example.com")
            .expect("Failed to issue token");

        match jwt.verify(&token).expect("Invalid token") {
            Claims::Admin(claims) => {
                assert_eq!(claims.email, "admin@example.com");
                assert_eq!(claims.role, "admin");
            }
            Claims::User(_) => panic!("admin token decoded as user"),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = JwtManager::new(SECRET, 7);
        let other = JwtManager::new("another-secret-key-at-least-32-chars", 7);

        let token = jwt
            .issue_user(UserId::new(), "test@example.com")
            .expect("Failed to issue token");

        assert!(matches!(other.verify(&token), Err(JwtError::Invalid)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = JwtManager::new(SECRET, 7);
        assert!(jwt.verify("not.a.jwt").is_err());
    }

    #[test]
    fn test_session_ttl_seconds() {
        let jwt = JwtManager::new(SECRET, 7);
        assert_eq!(jwt.session_ttl_seconds(), 604_800);
    }
}
