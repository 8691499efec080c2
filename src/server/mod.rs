//! HTTP surface of the development backend.
//!
//! Routes mirror the paths [`HttpCourseApi`](coursesync_core::HttpCourseApi)
//! calls, all served from a shared [`MemoryCourseApi`].

mod auth;
mod routes;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use coursesync_core::MemoryCourseApi;
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use auth::auth_middleware;
pub use routes::{health, ApiFailure, HealthResponse};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<MemoryCourseApi>,
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(api: MemoryCourseApi, api_token: Option<String>) -> Self {
        Self {
            api: Arc::new(api),
            api_token: api_token.map(Arc::from),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/courses/{id}/sections", get(routes::list_sections))
        .route("/sections", post(routes::create_section))
        .route(
            "/sections/{id}",
            put(routes::update_section).delete(routes::delete_section),
        )
        .route("/sections/{id}/lessons", get(routes::list_lessons))
        .route("/lessons", post(routes::create_lesson))
        .route(
            "/lessons/{id}",
            put(routes::update_lesson).delete(routes::delete_lesson),
        )
        .route("/lessons/{id}/questions", get(routes::list_questions))
        .route("/questions", post(routes::create_question))
        .route(
            "/questions/{id}",
            put(routes::update_question).delete(routes::delete_question),
        )
        .route("/questions/{id}/answers", get(routes::list_answers))
        .route("/answers", post(routes::create_answer))
        .route(
            "/answers/{id}",
            put(routes::update_answer).delete(routes::delete_answer),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
