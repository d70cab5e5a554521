//! Foodgram - A recipe sharing backend

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db,
};

/// How often expired auth tokens are purged
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Foodgram...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache)?;
    tracing::info!("Cache initialized");

    let cors_origin = config.server.cors_origin.clone();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool, cache, config);

    // Start expired token cleanup task
    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_tokens().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Expired tokens deleted"),
                    Err(e) => tracing::warn!("Failed to delete expired tokens: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &cors_origin);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
