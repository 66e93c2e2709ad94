use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(handlers::health_check))
        // Interview flow
        .route("/login", post(handlers::login))
        .route("/questions/:session_id", get(handlers::get_question))
        .route("/submit/:session_id", post(handlers::submit_answer))
        .route("/skip/:session_id", post(handlers::skip_question))
        // Answers are uploaded uncompressed
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        // Add tracing middleware for request logging
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
