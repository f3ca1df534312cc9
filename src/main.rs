use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use morning_briefing::config::Config;
use morning_briefing::fetcher::Fetcher;
use morning_briefing::routes::{self, AppState};
use morning_briefing::store::ArticleStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morning_briefing=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("BRIEFING_CONFIG").unwrap_or_else(|_| "briefing.toml".to_string());
    let config = Config::load_or_default(&config_path)?.apply_env_overrides();
    info!("Loaded {} feeds from configuration", config.feeds.len());

    // Open the article store
    let store = ArticleStore::open(&config.database_url).await?;
    store.initialize().await?;
    info!("Article store ready at {}", config.database_url);
    let store = Arc::new(store);

    let fetcher = Arc::new(Fetcher::from_config(&config)?);

    let state = Arc::new(AppState {
        store: store.clone(),
        fetcher,
        default_limit: config.default_limit,
    });

    let app = routes::router(state)
        .layer(routes::cors_layer(&config.frontend_origin))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Article store closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
