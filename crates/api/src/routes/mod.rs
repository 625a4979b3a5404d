//! API routes

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod users;
pub mod videos;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, state::AppState};

/// Public address substituted for loopback clients so local logins still
/// resolve a plausible location
const LOOPBACK_FALLBACK_IP: &str = "8.8.8.8";

/// Maximum accepted size for admin video uploads
const MAX_VIDEO_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Extract client IP address from request headers.
/// Prefers proxy-forwarded headers over the raw connection address.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("cf-connecting-ip"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
}

/// Resolve and normalize the caller's network origin.
/// Falls back to the socket address when no proxy header is present.
pub fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    let ip = extract_client_ip(headers).unwrap_or_else(|| addr.ip().to_string());

    // IPv4-mapped IPv6 form
    let ip = ip.strip_prefix("::ffff:").unwrap_or(&ip).to_string();

    if ip == "::1" || ip == "127.0.0.1" {
        return LOOPBACK_FALLBACK_IP.to_string();
    }
    ip
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Auth flows (no auth required)
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/verify-reset-code", post(auth::verify_reset_code))
        .route("/reset-password", post(auth::reset_password));

    // Protected routes (bearer token required) - under /api
    let protected_api_routes = Router::new()
        // Video catalog
        .route("/videos", get(videos::list_videos))
        .route("/like", post(videos::like_video))
        .route("/history", post(videos::record_watch))
        // Profile
        .route("/me", get(users::me))
        .route(
            "/user/balance",
            get(users::get_balance).post(users::update_balance),
        )
        .route("/user/withdraw", post(users::withdraw))
        // Admin-user chat
        .route("/chat/send-to-admin", post(chat::send_to_admin))
        .route("/chat/my-messages", get(chat::my_messages))
        .route("/chat/admin-messages", get(chat::admin_messages))
        .route(
            "/chat/messages/:email",
            get(chat::conversation_with).post(chat::send_to_user),
        )
        // Admin console (role check inside handlers)
        .route(
            "/admin/videos/upload",
            post(admin::upload_video).layer(DefaultBodyLimit::max(MAX_VIDEO_UPLOAD_BYTES)),
        )
        .route("/admin/videos/youtube", post(admin::add_youtube_video))
        .route("/admin/videos", get(admin::list_videos))
        .route("/admin/videos/:video_id", delete(admin::delete_video))
        .route("/admin/video-stats", get(admin::video_stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:user_id", delete(admin::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .nest("/api", protected_api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // Global request body size limit; the upload route raises its own
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_forwarded_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(
            client_ip(&headers, &addr("192.0.2.1:443")),
            "203.0.113.9"
        );
    }

    #[test]
    fn test_cf_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(client_ip(&headers, &addr("192.0.2.1:443")), "198.51.100.2");
    }

    #[test]
    fn test_socket_address_fallback() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, &addr("192.0.2.1:443")), "192.0.2.1");
    }

    #[test]
    fn test_mapped_ipv6_prefix_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("::ffff:203.0.113.9"));

        assert_eq!(client_ip(&headers, &addr("192.0.2.1:443")), "203.0.113.9");
    }

    #[test]
    fn test_loopback_substituted() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, &addr("127.0.0.1:5000")), "8.8.8.8");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("::ffff:127.0.0.1"));
        assert_eq!(client_ip(&headers, &addr("192.0.2.1:443")), "8.8.8.8");
    }
}
