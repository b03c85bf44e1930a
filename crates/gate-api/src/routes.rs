//! # Routes
//!
//! Axum router configuration for the gate API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// CORS restricted to the configured browser origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the main application router
///
/// Routes:
/// - POST /create-checkout-session - Create checkout and payment record
/// - POST /webhook - Stripe webhook (raw signed body)
/// - POST /api/generate-token - Issue access token
/// - POST /api/validate-token - Validate access token
/// - POST /api/check-status - Read a record's `played` flag
/// - POST /api/mark-played - Set a record's `played` flag
/// - GET  /health - Health check
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let api_routes = Router::new()
        .route("/generate-token", post(handlers::generate_token))
        .route("/validate-token", post(handlers::validate_token))
        .route("/check-status", post(handlers::check_status))
        .route("/mark-played", post(handlers::mark_played));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // Checkout
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        // Stripe webhook, body is read raw for signature verification
        .route("/webhook", post(handlers::stripe_webhook))
        // Game access API
        .nest("/api", api_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}
