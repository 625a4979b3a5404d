//! Authentication module for VidVault

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;

pub use jwt::{Claims, JwtManager};
pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, verify_password};
pub use tokens::{TokenError, TokenManager};
