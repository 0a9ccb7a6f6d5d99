// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, progress},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * All engine routes sit behind the bearer-token middleware.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let engine_routes = Router::new()
        .route("/quizzes/{quiz_id}/attempts", post(attempt::start_attempt))
        .route(
            "/quizzes/{quiz_id}/attempts/{attempt_id}",
            get(attempt::get_quiz_for_attempt),
        )
        .route(
            "/quizzes/{quiz_id}/history",
            get(attempt::get_attempt_history),
        )
        .route("/attempts/{attempt_id}/submit", post(attempt::submit_attempt))
        .route("/attempts/{attempt_id}/result", get(attempt::get_attempt_result))
        .route("/modules/{module_id}/progress", get(progress::module_progress))
        .route("/courses/{course_id}/progress", get(progress::course_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api", engine_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
