/// API route modules
pub mod health;
pub mod segments;
pub mod users;

use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Build the HTTP router over the shared application state
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Segments
        .route("/segment/add", post(segments::add_segment))
        .route("/segment/delete", delete(segments::delete_segment))
        // Users
        .route("/user/segment", put(users::update_user_segments))
        .route("/user/history/:user_id", get(users::get_user_history))
        .route("/user/:user_id", get(users::get_user_segments))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
