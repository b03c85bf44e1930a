//! # Payment Strategy Trait
//!
//! Seam between the HTTP layer and the checkout provider. Stripe is the only
//! implementation; tests substitute their own.

use crate::error::GateResult;
use crate::order::{CheckoutSession, Order, WebhookEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Create a hosted checkout session and return the redirect URL.
    ///
    /// # Arguments
    /// * `order` - The order to check out
    /// * `success_url` - URL to redirect after successful payment
    /// * `cancel_url` - URL to redirect if customer cancels
    async fn create_checkout(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> GateResult<CheckoutSession>;

    /// Expire an open checkout session so it can no longer be paid.
    async fn cancel_checkout(&self, session_id: &str) -> GateResult<()>;

    /// Verify a webhook signature and parse the event.
    ///
    /// The payload must not be interpreted unless verification succeeds.
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> GateResult<WebhookEvent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;
