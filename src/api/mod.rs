//! REST API module using Axum
//!
//! Command and snapshot surface for the presentation layer, plus optional
//! mock ingestion endpoints so the HTTP transport can target this process.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Env var holding a comma-separated list of allowed CORS origins.
pub const CORS_ENV_VAR: &str = "FLOWSIM_CORS_ORIGINS";

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `FLOWSIM_CORS_ORIGINS` to a comma-separated list of allowed origins
/// when the renderer is served from elsewhere.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState, mock_ingest: bool) -> Router {
    let mut app = Router::new().nest("/api/v1", routes::api_routes(state));
    if mock_ingest {
        app = app.merge(routes::ingest_routes());
    }

    app.fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
