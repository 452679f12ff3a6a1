//! HTTP API server

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::{Config, SwaggerUi};

use crate::config::ServerConfig;

pub mod docs;
pub mod extract;
pub mod handlers;
pub mod state;

pub use state::AppState;
pub use state::DbDiagnostics;

/// Build the API router using the provided application state
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/items", get(handlers::list_items))
        .route("/secure-items", get(handlers::list_secure_items))
        .route("/db-check", get(handlers::db_check))
        .route("/completions", post(handlers::create_completion))
        .route("/completions/stream", post(handlers::stream_completion));

    if server.docs_enabled {
        router = router
            .route("/openapi.json", get(docs::openapi_json))
            .merge(SwaggerUi::new("/docs").config(Config::new(["/openapi.json"])));
    }

    router
        .layer(cors_layer(&server.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` admits any origin without credentials; a concrete origin allows credentials.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(AllowMethods::any())
            .allow_headers(AllowHeaders::any());
    }

    let origin = match HeaderValue::from_str(origin.trim()) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(%origin, error = %err, "Invalid CORS origin; denying cross-origin requests");
            return CorsLayer::new();
        }
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
