//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Batch creation of fully named handles
        .route("/handles", post(handlers::create_handles))
        // `prefix/suffix`, `index:prefix/suffix`, or `prefix` for batch creation
        .route(
            "/handles/*reference",
            get(handlers::get_handle)
                .put(handlers::put_handle)
                .post(handlers::post_handle)
                .delete(handlers::delete_handle),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
