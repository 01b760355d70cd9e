//! services/admin/src/bin/admin.rs

use admin_lib::{
    adapters::{FileStore, RemoteApiAdapter},
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use lam_phuong_core::{
    Clock, KeyValueStore, LocalResponseCache, MemoryStore, ResourceLoader, SystemClock,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Remote API Client ---
    let http = reqwest::Client::builder()
        .timeout(config.api_timeout)
        .build()?;
    let remote = Arc::new(RemoteApiAdapter::new(
        http.clone(),
        config.api_base_url.clone(),
    ));
    info!("Remote API at {}", config.api_base_url);

    // --- 3. Response Cache ---
    let cache_store: Arc<dyn KeyValueStore> = match &config.cache_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            info!("Persisting response cache in {}", dir.display());
            Arc::new(FileStore::new(dir.clone()))
        }
        None => {
            info!("Keeping response cache in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(LocalResponseCache::new(cache_store, clock.clone()));
    let cache_ttl = chrono::Duration::from_std(config.cache_ttl)
        .map_err(|e| ApiError::Internal(format!("Invalid cache TTL: {}", e)))?;
    let resources = Arc::new(ResourceLoader::new(remote.clone(), cache, cache_ttl));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        remote,
        resources,
        clock,
        http,
    )?);

    // --- 5. Create the Web Router ---
    let mut api_router = build_router(app_state);
    if let Some(origin) = &config.cors_origin {
        let origin = origin.parse::<HeaderValue>().map_err(|e| {
            ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", origin, e))
        })?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
        api_router = api_router.layer(cors);
    }

    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
