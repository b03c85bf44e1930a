//! # Order Types
//!
//! Order, checkout session and webhook event types for playgate.

use crate::product::{Currency, Price, Product};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key carrying the payment record id through the checkout session
pub const RECORD_ID_METADATA_KEY: &str = "firestoreDocId";

/// A line item in an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Product name (shown on the hosted page)
    pub name: String,

    /// Unit price
    pub unit_price: Price,

    /// Quantity
    pub quantity: u32,
}

impl LineItem {
    /// Create a line item from a product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            name: product.name.clone(),
            unit_price: product.price.clone(),
            quantity,
        }
    }

    /// Calculate the total price for this line item
    pub fn total(&self) -> Price {
        Price {
            amount: self.unit_price.amount * self.quantity as i64,
            currency: self.unit_price.currency,
        }
    }
}

/// Checkout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment
    #[default]
    Payment,
}

/// An order to be checked out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Line items
    pub line_items: Vec<LineItem>,

    /// Currency (must be same for all items)
    pub currency: Currency,

    /// Checkout mode
    #[serde(default)]
    pub mode: CheckoutMode,

    /// Accepted payment method types
    pub payment_method_types: Vec<String>,

    /// Idempotency key (prevents duplicate sessions for the same record)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// Metadata echoed back by the provider on webhook events
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Order {
    /// Create an empty card-payment order
    pub fn new(currency: Currency) -> Self {
        Self {
            line_items: Vec::new(),
            currency,
            mode: CheckoutMode::Payment,
            payment_method_types: vec!["card".to_string()],
            idempotency_key: None,
            metadata: HashMap::new(),
        }
    }

    /// Create an order for a single unit of `product`
    pub fn for_product(product: &Product) -> Self {
        let mut order = Self::new(product.price.currency);
        order.add_item(LineItem::from_product(product, 1));
        order
    }

    /// Add a line item
    pub fn add_item(&mut self, item: LineItem) {
        self.line_items.push(item);
    }

    /// Calculate order total
    pub fn total(&self) -> Price {
        let total_amount: i64 = self.line_items.iter().map(|item| item.total().amount).sum();
        Price {
            amount: total_amount,
            currency: self.currency,
        }
    }

    /// Set idempotency key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The payment record this order pays for, if tagged
    pub fn record_id(&self) -> Option<&str> {
        self.metadata.get(RECORD_ID_METADATA_KEY).map(String::as_str)
    }

    /// Check if order is empty
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// A checkout session created by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect customer to for payment
    pub checkout_url: String,

    /// When the session expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Create a new checkout session
    pub fn new(
        session_id: impl Into<String>,
        provider: impl Into<String>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider: provider.into(),
            checkout_url: checkout_url.into(),
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Checkout session completed
    CheckoutCompleted,
    /// Checkout session expired unpaid
    CheckoutExpired,
    /// Anything else (acknowledged and ignored)
    Unknown(String),
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    /// Event type
    pub event_type: WebhookEventType,

    /// Provider name
    pub provider: String,

    /// Related session ID (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// The event's `data.object`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_for_product() {
        let order = Order::for_product(&Product::game_play_access())
            .with_metadata(RECORD_ID_METADATA_KEY, "rec_1")
            .with_idempotency_key("rec_1");

        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].quantity, 1);
        assert_eq!(order.total().amount, 5000);
        assert_eq!(order.mode, CheckoutMode::Payment);
        assert_eq!(order.payment_method_types, vec!["card".to_string()]);
        assert_eq!(order.record_id(), Some("rec_1"));
    }

    #[test]
    fn test_empty_order() {
        let order = Order::new(Currency::USD);
        assert!(order.is_empty());
        assert_eq!(order.record_id(), None);
        assert_eq!(order.total().amount, 0);
    }
}
