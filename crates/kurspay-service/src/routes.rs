//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{access, health, maintenance, payments, purchases, users};
use crate::state::AppState;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Users (JWT auth)
/// - `POST /v1/users` - Register the caller's user record
/// - `POST /v1/purchases` - Create a pending purchase (rate-limited)
/// - `GET /v1/access/me` - Get the caller's course grants
///
/// ## Payment review (JWT auth + admin role)
/// - `GET /v1/payments/pending` - List pending transactions, oldest first
/// - `GET /v1/payments/{id}` - Fetch one transaction
/// - `POST /v1/payments/{id}/confirm` - Confirm a payment
/// - `POST /v1/payments/{id}/reject` - Reject a payment
///
/// ## Maintenance (JWT auth + admin role)
/// - `POST /v1/maintenance/sweep` - Run an expiry sweep now
/// - `POST /v1/maintenance/rate-limits/reset` - Reset a throttle counter
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Users and purchases
        .route("/users", post(users::register_user))
        .route("/purchases", post(purchases::create_purchase))
        .route("/access/me", get(access::get_my_access))
        // Payment review. The literal "pending" segment wins over ":id".
        .route("/payments/pending", get(payments::list_pending))
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments/:id/confirm", post(payments::confirm_payment))
        .route("/payments/:id/reject", post(payments::reject_payment))
        // Maintenance
        .route("/maintenance/sweep", post(maintenance::run_sweep))
        .route(
            "/maintenance/rate-limits/reset",
            post(maintenance::reset_rate_limit),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
