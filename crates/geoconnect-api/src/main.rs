//! GeoConnect API Server
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use geoconnect_api::{create_router, state::AppState};
use geoconnect_blob::GcsBlobStore;
use geoconnect_core::config::{AppConfig, LoggingConfig};
use geoconnect_search::{ensure_indices, ElasticClient, EsCredentialStore, EsPostStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "geoconnect_api={level},geoconnect_search={level},audit=info,tower_http=info",
            level = config.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    // Collaborators
    let es = Arc::new(ElasticClient::new(&config.search)?);
    ensure_indices(&es, &config.search)
        .await
        .context("Failed to prepare Elasticsearch indices")?;
    let credentials = Arc::new(EsCredentialStore::new(
        es.clone(),
        config.search.users_index.clone(),
    ));
    let posts = Arc::new(EsPostStore::new(es, config.search.posts_index.clone()));
    let blobs = Arc::new(GcsBlobStore::from_config(&config.storage)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, credentials, posts, blobs)?);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("GeoConnect API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
