//! Email verification tokens and password reset codes
//!
//! Single-use, expiring tokens persisted in the `auth_tokens` table. The raw
//! token value is the lookup key. Issuing a new token deletes any prior token
//! of the same kind for that user, so at most one is live at a time. Expired
//! tokens are deleted at the moment the expiry is detected; there is no
//! background cleanup.

use rand::Rng;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use vidvault_shared::UserId;

/// Verification tokens are valid for one hour
pub const VERIFY_TOKEN_TTL_MINUTES: i64 = 60;
/// Reset codes are valid for fifteen minutes
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

/// Token kind for verification flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "verify",
            TokenKind::PasswordReset => "reset",
        }
    }

    fn ttl(&self) -> Duration {
        match self {
            TokenKind::EmailVerification => Duration::minutes(VERIFY_TOKEN_TTL_MINUTES),
            TokenKind::PasswordReset => Duration::minutes(RESET_CODE_TTL_MINUTES),
        }
    }
}

/// A live token row
#[derive(Debug, sqlx::FromRow)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub email: String,
    pub expires_at: OffsetDateTime,
}

/// Token manager for email verification and password reset
pub struct TokenManager {
    pool: PgPool,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Generate an opaque random token
    ///
    /// Returns a 16-byte hex-encoded token (32 characters)
    fn generate_hex_token() -> String {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 16] = rng.gen();
        hex::encode(bytes)
    }

    /// Generate a 6-digit numeric reset code
    fn generate_reset_code() -> String {
        let mut rng = rand::thread_rng();
        rng.gen_range(100_000..1_000_000).to_string()
    }

    /// Issue an email verification token, superseding any prior one
    pub async fn issue_verification(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<String, sqlx::Error> {
        self.issue(user_id, email, TokenKind::EmailVerification, Self::generate_hex_token())
            .await
    }

    /// Issue a password reset code, superseding any prior one
    pub async fn issue_reset_code(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<String, sqlx::Error> {
        self.issue(user_id, email, TokenKind::PasswordReset, Self::generate_reset_code())
            .await
    }

    async fn issue(
        &self,
        user_id: UserId,
        email: &str,
        kind: TokenKind,
        value: String,
    ) -> Result<String, sqlx::Error> {
        // Invariant: at most one live token of a kind per identity
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        let expires_at = OffsetDateTime::now_utc() + kind.ttl();

        sqlx::query(
            r#"
            INSERT INTO auth_tokens (id, user_id, email, token, kind, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(email)
        .bind(&value)
        .bind(kind.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = %user_id,
            kind = %kind.as_str(),
            expires_at = %expires_at,
            "Auth token issued"
        );

        Ok(value)
    }

    /// Look up a live verification token by its raw value
    ///
    /// An expired token is deleted before the failure is reported.
    pub async fn find_valid_verification(&self, token: &str) -> Result<TokenRecord, TokenError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
            SELECT id, user_id, email, expires_at
            FROM auth_tokens
            WHERE token = $1 AND kind = $2
            "#,
        )
        .bind(token)
        .bind(TokenKind::EmailVerification.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| TokenError::Database)?;

        self.check_expiry(record).await
    }

    /// Look up a live reset code by (email, code)
    ///
    /// An expired code is deleted before the failure is reported.
    pub async fn find_valid_reset(
        &self,
        email: &str,
        code: &str,
    ) -> Result<TokenRecord, TokenError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
            SELECT id, user_id, email, expires_at
            FROM auth_tokens
            WHERE email = $1 AND token = $2 AND kind = $3
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(TokenKind::PasswordReset.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| TokenError::Database)?;

        self.check_expiry(record).await
    }

    async fn check_expiry(&self, record: Option<TokenRecord>) -> Result<TokenRecord, TokenError> {
        let record = record.ok_or(TokenError::NotFound)?;

        if OffsetDateTime::now_utc() > record.expires_at {
            tracing::warn!(
                token_id = %record.id,
                user_id = %record.user_id,
                expires_at = %record.expires_at,
                "Expired auth token presented, deleting"
            );
            sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
                .bind(record.id)
                .execute(&self.pool)
                .await
                .map_err(|_| TokenError::Database)?;
            return Err(TokenError::Expired);
        }

        Ok(record)
    }

    /// Consume a token (single-use deletion)
    pub async fn consume(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(token_id = %id, "Auth token consumed");
        Ok(())
    }
}

/// Token validation errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid or unknown token")]
    NotFound,
    #[error("Token has expired")]
    Expired,
    #[error("Database error")]
    Database,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_token_generation() {
        let token1 = TokenManager::generate_hex_token();
        let token2 = TokenManager::generate_hex_token();

        // Tokens should be 32 characters (16 bytes hex-encoded)
        assert_eq!(token1.len(), 32);
        assert_eq!(token2.len(), 32);

        // Tokens should be unique
        assert_ne!(token1, token2);

        // Tokens should only contain hex characters
        assert!(token1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reset_code_generation() {
        for _ in 0..100 {
            let code = TokenManager::generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            // No leading zero: codes are drawn from [100000, 999999]
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn test_token_kind_as_str() {
        assert_eq!(TokenKind::EmailVerification.as_str(), "verify");
        assert_eq!(TokenKind::PasswordReset.as_str(), "reset");
    }

    #[test]
    fn test_token_ttls() {
        assert_eq!(
            TokenKind::EmailVerification.ttl(),
            Duration::minutes(60)
        );
        assert_eq!(TokenKind::PasswordReset.ttl(), Duration::minutes(15));
    }
}
