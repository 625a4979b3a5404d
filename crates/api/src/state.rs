//! Shared application state

use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    auth::JwtManager, config::Config, email::EmailService, geo::GeoClient, media::MediaClient,
};

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub jwt_manager: JwtManager,
    pub email: EmailService,
    pub geo: GeoClient,
    pub media: MediaClient,
}

impl AppState {
    /// Build application state from configuration and a connected pool
    pub fn new(config: Config, pool: PgPool) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.session_ttl_days);

        Self {
            config: Arc::new(config),
            pool,
            jwt_manager,
            email: EmailService::from_env(),
            geo: GeoClient::from_env(),
            media: MediaClient::from_env(),
        }
    }
}
