//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

mod extract;
pub mod http;

/// Build the application router with:
/// - tutoring API at the root (`/chat`, `/quiz/...`, `/progress/...`, `/history/...`, `/leaderboard`)
/// - CORS (allow any origin/method/headers) for the browser client
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::http_root))
        .route("/health", get(http::http_health))
        .route("/chat", post(http::http_post_chat))
        .route("/quiz/generate", post(http::http_post_quiz_generate))
        .route("/quiz/submit", post(http::http_post_quiz_submit))
        .route("/progress/:subject", get(http::http_get_progress))
        .route(
            "/history/:subject",
            get(http::http_get_history).delete(http::http_delete_history),
        )
        .route("/leaderboard", get(http::http_get_leaderboard))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
