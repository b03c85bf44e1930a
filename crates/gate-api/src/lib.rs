//! # gate-api
//!
//! HTTP API layer for playgate.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout creation backed by Stripe and Firestore
//! - Stripe webhook fulfillment
//! - Short-lived access tokens for the game
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/create-checkout-session` | Create checkout session, returns `{url}` |
//! | POST | `/webhook` | Stripe webhook |
//! | POST | `/api/generate-token` | Issue access token |
//! | POST | `/api/validate-token` | Validate access token |
//! | POST | `/api/check-status` | `{userId}` → `{played}` |
//! | POST | `/api/mark-played` | `{userId}` → `{success}` |

pub mod fulfillment;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod token;

pub use routes::create_router;
pub use state::{AppConfig, AppState, StoreBackend};
pub use token::AccessTokens;
