//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API.
//! Sessions are created with inline `price_data`, so no Stripe-side product
//! catalog is needed.

use crate::config::StripeConfig;
use crate::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_core::{
    CheckoutMode, CheckoutSession, GateError, GateResult, Order, PaymentStrategy, WebhookEvent,
    WebhookEventType,
};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session strategy
///
/// Uses Stripe's hosted checkout page; card data never touches this server.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutStrategy {
    /// Create a new Stripe checkout strategy
    pub fn new(config: StripeConfig) -> GateResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> GateResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Convert our checkout mode to Stripe's mode
    fn stripe_mode(mode: CheckoutMode) -> &'static str {
        match mode {
            CheckoutMode::Payment => "payment",
        }
    }

    /// Flatten an order into Stripe's bracketed form encoding
    fn form_params(order: &Order, success_url: &str, cancel_url: &str) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), Self::stripe_mode(order.mode).to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        for (i, method) in order.payment_method_types.iter().enumerate() {
            params.push((format!("payment_method_types[{}]", i), method.clone()));
        }

        for (i, item) in order.line_items.iter().enumerate() {
            params.push((
                format!("line_items[{}][price_data][currency]", i),
                item.unit_price.currency.as_str().to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_price.amount.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            params.push((format!("line_items[{}][quantity]", i), item.quantity.to_string()));
        }

        for (key, value) in &order.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }

    /// Read a Stripe response body, turning non-2xx into `ProviderError`
    async fn read_body(response: Response) -> GateResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        error!("Stripe API error: status={}, body={}", status, body);

        let message = serde_json::from_str::<StripeErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        Err(GateError::ProviderError {
            provider: PROVIDER.to_string(),
            message,
        })
    }
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, order), fields(record_id = ?order.record_id()))]
    async fn create_checkout(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> GateResult<CheckoutSession> {
        if order.is_empty() {
            return Err(GateError::InvalidRequest("Order has no items".to_string()));
        }

        let form_params = Self::form_params(order, success_url, cancel_url);
        debug!("Creating Stripe checkout session: {} params", form_params.len());

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version);

        if let Some(key) = &order.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .form(&form_params)
            .send()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        let body = Self::read_body(response).await?;

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            GateError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let checkout_url = session.url.ok_or_else(|| GateError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("Checkout session {} has no url", session.id),
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(CheckoutSession {
            session_id: session.id,
            provider: PROVIDER.to_string(),
            checkout_url,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn cancel_checkout(&self, session_id: &str) -> GateResult<()> {
        let url = format!(
            "{}/v1/checkout/sessions/{}/expire",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        Self::read_body(response).await?;
        info!("Expired Stripe checkout session: id={}", session_id);
        Ok(())
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> GateResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            Utc::now().timestamp(),
            DEFAULT_TOLERANCE_SECS,
        )?;

        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            GateError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        let event_type = match event.event_type.as_str() {
            "checkout.session.completed" => WebhookEventType::CheckoutCompleted,
            "checkout.session.expired" => WebhookEventType::CheckoutExpired,
            other => WebhookEventType::Unknown(other.to_string()),
        };

        let session_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(WebhookEvent {
            event_id: event.id,
            event_type,
            provider: PROVIDER.to_string(),
            session_id,
            raw_data: Some(serde_json::Value::Object(event.data.object)),
            timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::signature_header;
    use gate_core::{Product, RECORD_ID_METADATA_KEY};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    fn strategy(base_url: &str) -> StripeCheckoutStrategy {
        let config =
            StripeConfig::new("sk_test_abc123", WEBHOOK_SECRET).with_api_base_url(base_url);
        StripeCheckoutStrategy::new(config).unwrap()
    }

    fn game_order() -> Order {
        Order::for_product(&Product::game_play_access())
            .with_metadata(RECORD_ID_METADATA_KEY, "rec_1")
            .with_idempotency_key("rec_1")
    }

    #[test]
    fn test_form_params() {
        let params = StripeCheckoutStrategy::form_params(
            &game_order(),
            "https://game.example/?userId=rec_1",
            "https://game.example/cancel",
        );
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("payment_method_types[0]"), Some("card"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("5000"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Game Play Access")
        );
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[firestoreDocId]"), Some("rec_1"));
        assert_eq!(get("success_url"), Some("https://game.example/?userId=rec_1"));
    }

    #[tokio::test]
    async fn test_create_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(header("Idempotency-Key", "rec_1"))
            .and(body_string_contains("metadata%5BfirestoreDocId%5D=rec_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_123",
                "expires_at": 1_700_086_400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = strategy(&server.uri())
            .create_checkout(&game_order(), "https://ok", "https://cancel")
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_123");
        assert_eq!(
            session.checkout_url,
            "https://checkout.stripe.com/c/pay/cs_test_123"
        );
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_create_checkout_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid API Key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = strategy(&server.uri())
            .create_checkout(&game_order(), "https://ok", "https://cancel")
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::ProviderError { .. }));
        assert!(err.to_string().contains("Invalid API Key provided"));
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let err = strategy("http://127.0.0.1:9")
            .create_checkout(
                &Order::new(gate_core::Currency::USD),
                "https://ok",
                "https://cancel",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_cancel_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions/cs_test_123/expire"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "status": "expired"
            })))
            .expect(1)
            .mount(&server)
            .await;

        strategy(&server.uri())
            .cancel_checkout("cs_test_123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verify_webhook_checkout_completed() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": { "object": {
                "id": "cs_test_123",
                "metadata": { "firestoreDocId": "rec_1" },
                "customer_details": { "email": "a@b.com", "name": "A" }
            }}
        })
        .to_string();
        let signature =
            signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), payload.as_bytes()).unwrap();

        let event = strategy("http://127.0.0.1:9")
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.event_id, "evt_1");
        assert_eq!(event.event_type, WebhookEventType::CheckoutCompleted);
        assert_eq!(event.session_id.as_deref(), Some("cs_test_123"));
    }

    #[tokio::test]
    async fn test_verify_webhook_rejects_before_parsing() {
        let err = strategy("http://127.0.0.1:9")
            .verify_webhook(b"not json at all", "t=1,v1=00")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::WebhookVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_verify_webhook_unknown_type() {
        let payload = json!({
            "id": "evt_2",
            "type": "invoice.paid",
            "created": 1_700_000_000,
            "data": { "object": { "id": "in_1" } }
        })
        .to_string();
        let signature =
            signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), payload.as_bytes()).unwrap();

        let event = strategy("http://127.0.0.1:9")
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();
        assert_eq!(
            event.event_type,
            WebhookEventType::Unknown("invoice.paid".to_string())
        );
    }
}
