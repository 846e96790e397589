//! Refrain Server Library
//!
//! Per-user music queue service: HTTP API, JWT middleware, the queue
//! services and the inbound message workers.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use services::AuthService;
pub use state::AppState;

/// Build the HTTP router
///
/// `/api/*` routes other than health require a bearer token. The broker
/// push endpoint under `/internal` is not behind JWT auth.
pub fn create_router(app_state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(api::health::health));

    let protected_routes = Router::new()
        // Queue
        .route(
            "/queue",
            get(api::queue::get_queue).post(api::queue::insert_song),
        )
        .route("/queue/check", post(api::queue::check_queue))
        .route("/queue/skipped", post(api::queue::song_skipped))
        .route("/queue/finished", post(api::queue::song_finished))
        // Likes
        .route(
            "/songs/:id/liked",
            get(api::songs::get_liked).post(api::songs::like),
        )
        .route("/songs/:id/unliked", post(api::songs::unlike))
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&app_state.auth_service),
            middleware::auth_middleware,
        ));

    let internal_routes = Router::new().route("/events/:topic", post(api::events::receive));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .nest("/internal", internal_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
