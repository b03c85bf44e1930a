//! # Stripe Webhook Handling
//!
//! Typed views over verified webhook events and dispatch to a handler.

use async_trait::async_trait;
use gate_core::{GateError, GateResult, WebhookEvent, WebhookEventType, RECORD_ID_METADATA_KEY};
use std::collections::HashMap;
use tracing::{debug, info};

/// Parsed checkout.session.completed event data
#[derive(Debug, Clone)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl CheckoutCompletedData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> GateResult<Self> {
        let obj = event
            .raw_data
            .as_ref()
            .and_then(|raw| raw.as_object())
            .ok_or_else(|| GateError::WebhookParseError("Event has no data object".to_string()))?;

        let session_id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| GateError::WebhookParseError("Missing session id".to_string()))?;

        let customer_detail = |field: &str| {
            obj.get("customer_details")
                .and_then(|cd| cd.get(field))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            session_id,
            customer_email: customer_detail("email"),
            customer_name: customer_detail("name"),
            metadata,
        })
    }

    /// The payment record this session was created for
    pub fn record_id(&self) -> Option<&str> {
        self.metadata
            .get(RECORD_ID_METADATA_KEY)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Webhook event handler trait
///
/// Only completion carries work; the other hooks log by default.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> GateResult<()>;

    /// Called when a checkout session expires unpaid
    async fn on_checkout_expired(&self, event: &WebhookEvent) -> GateResult<()> {
        info!("Checkout expired: {:?}", event.session_id);
        Ok(())
    }

    /// Called for unhandled event types
    async fn on_unknown_event(&self, event: &WebhookEvent) -> GateResult<()> {
        debug!("Ignoring webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Dispatch a webhook event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: WebhookEvent,
) -> GateResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutCompletedData::from_event(&event)?;
            handler.on_checkout_completed(data).await
        }
        WebhookEventType::CheckoutExpired => handler.on_checkout_expired(&event).await,
        WebhookEventType::Unknown(_) => handler.on_unknown_event(&event).await,
    }
}
