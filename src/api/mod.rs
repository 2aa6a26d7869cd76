//! Minimal Newznab-style REST API surface over the release/cursor store.
//!
//! Exposes health, search, and NZB retrieval only; full caps/RSS templating
//! and quota middleware are not implemented by this stub.

use crate::ingest_core::IngestCore;
use crate::{Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /api` - Newznab-style dispatcher (`t=search|tvsearch|movie|music|book|getnzb|caps`)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(core: Arc<IngestCore>, config: Arc<Config>) -> Router {
    let state = AppState::new(core, config.clone());

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .route("/api", get(routes::search))
        .route("/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }));

    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until the process is stopped;
/// the caller is responsible for coordinating shutdown with [`IngestCore::shutdown`].
///
/// # Example
///
/// ```no_run
/// use usenet_dl::{Config, IngestCore};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let core = Arc::new(IngestCore::new(config.clone()).await?);
/// usenet_dl::api::start_api_server(core, Arc::new(config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(core: Arc<IngestCore>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(core, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
