//! # gate-stripe
//!
//! Stripe payment strategy for playgate.
//!
//! - **StripeCheckoutStrategy** creates hosted Checkout Sessions with inline
//!   `price_data`, expires sessions, and verifies webhook deliveries
//! - **signature** implements the `Stripe-Signature` HMAC scheme
//! - **webhook** turns verified events into typed data and dispatches them
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use gate_stripe::{dispatch_webhook_event, CheckoutCompletedData, WebhookHandler};
//!
//! struct Fulfillment;
//!
//! #[async_trait]
//! impl WebhookHandler for Fulfillment {
//!     async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> GateResult<()> {
//!         println!("Record {:?} paid", data.record_id());
//!         Ok(())
//!     }
//! }
//!
//! let event = strategy.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&Fulfillment, event).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutStrategy;
pub use config::StripeConfig;
pub use signature::{signature_header, verify_signature};
pub use webhook::{dispatch_webhook_event, CheckoutCompletedData, WebhookHandler};
