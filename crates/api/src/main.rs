//! VidVault API server

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use vidvault_api::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool =
        vidvault_shared::create_pool(&config.database_url, config.database_max_connections).await?;
    vidvault_shared::run_migrations(&pool).await?;
    tracing::info!("Database connected and migrations applied");

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, pool);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "VidVault API listening");

    // ConnectInfo is needed for the login flow's socket-address fallback
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
