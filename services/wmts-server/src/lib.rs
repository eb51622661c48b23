//! WMTS tile proxy server library: application state and router assembly.
//!
//! Kept as a library so integration tests can drive the router without
//! binding a socket.

pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Assemble the service router: the JSON endpoints, the utility routes, and
/// the WMTS tile fallback, wrapped in permissive CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/layersInfo", get(handlers::layers_info_handler))
        .route(
            "/getTileByXY/:layer/:zoom/:x/:y",
            get(handlers::tile_by_xy_handler),
        )
        .route("/time", get(handlers::time_handler))
        .route("/version", get(handlers::version_handler))
        .route("/readiness", get(handlers::readiness_handler))
        .route("/health", get(handlers::health_handler))
        .fallback(get(handlers::wmts_tile_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
