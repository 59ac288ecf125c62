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

use crate::handlers::{balances, health, loot, rewards};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for reward and loot endpoints.
const REWARD_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Balances
/// - `GET /v1/users/:user_id/balances` - All balances
/// - `GET /v1/users/:user_id/balances/:currency` - One balance
/// - `GET /v1/users/:user_id/transactions` - Transaction trail
/// - `POST /v1/users/:user_id/credits` - Credit currency
/// - `POST /v1/users/:user_id/debits` - Debit currency
/// - `POST /v1/users/:user_id/affordability` - Affordability check
///
/// ## Rewards (own concurrency limit)
/// - `POST /v1/users/:user_id/rewards` - Apply a reward bundle
/// - `POST /v1/users/:user_id/loot/instant` - Collect instant loot
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let reward_routes = Router::new()
        .route("/rewards", post(rewards::apply_rewards))
        .route("/loot/instant", post(loot::collect_instant_loot))
        .layer(ConcurrencyLimitLayer::new(REWARD_MAX_CONCURRENT_REQUESTS));

    let user_routes = Router::new()
        .route("/balances", get(balances::get_balances))
        .route("/balances/:currency", get(balances::get_balance))
        .route("/transactions", get(balances::list_transactions))
        .route("/credits", post(balances::credit))
        .route("/debits", post(balances::debit))
        .route("/affordability", post(balances::check_affordability))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .merge(reward_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1/users/:user_id", user_routes)
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
