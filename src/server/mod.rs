use axum::{
    Router,
    http::HeaderValue,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{CorsConfig, SkywatchConfig};
use crate::storage::Database;

pub mod error;
pub mod routes;

/// Server state
pub struct AppState {
    pub database: Database,
}

/// Build the API router
pub fn router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route(
            "/reports",
            get(routes::list_reports).post(routes::create_report),
        )
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.is_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers echo the preflight
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn start_server(config: SkywatchConfig) -> anyhow::Result<()> {
    let database = Database::new(config.database.clone());
    database.initialize()?;

    if config.cors.is_permissive() {
        tracing::warn!("CORS allows all origins; set cors.allow_origins before exposing the service");
    }

    let state = Arc::new(AppState { database });
    let app = router(state, &config.cors);

    let addr = config.server.bind;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
