//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Largest accepted request body; reference uploads and inline references
/// carry whole audio files.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Every route that sits behind authentication.
///
/// Returned without state applied; the caller adds layers and state.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Synchronous generation
        .route("/v1/tts", post(handlers::tts::synthesize))
        .route("/v1/vqgan/encode", post(handlers::vqgan::encode))
        .route("/v1/vqgan/decode", post(handlers::vqgan::decode))
        // References
        .route("/v1/references/add", post(handlers::references::add))
        .route("/v1/references/list", get(handlers::references::list))
        .route("/v1/references/delete", delete(handlers::references::delete))
        .route("/v1/references/update", post(handlers::references::update))
        // Asynchronous tasks
        .route(
            "/generate_audio_enhanced_async",
            post(handlers::tasks::submit),
        )
        .route("/get_task_status", get(handlers::tasks::status))
        .route("/download_result", get(handlers::tasks::download))
        .route("/stop_generation", post(handlers::tasks::stop_all))
        .route("/stop_async_task/{step_id}", post(handlers::tasks::stop_one))
}

/// Create the main router.
///
/// `/v1/health` is registered outside the auth layer and stays reachable
/// without a token.
pub fn create_router(ctx: AxumContext, cors: &CorsConfig) -> Router {
    let api_key = ctx.api_key.clone();
    let state: AppState = Arc::new(ctx);

    let mut api = api_routes();
    if let Some(expected) = api_key {
        let auth_layer = middleware::from_fn(move |req: Request, next: Next| {
            let expected = Arc::clone(&expected);
            async move { require_bearer(expected, req, next).await }
        });
        api = api.route_layer(auth_layer);
    }

    Router::new()
        .route(
            "/v1/health",
            get(handlers::health::health).post(handlers::health::health),
        )
        .merge(api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
