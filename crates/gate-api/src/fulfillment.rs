//! # Fulfillment
//!
//! Records the customer on the payment record once Stripe reports the
//! checkout complete.

use async_trait::async_trait;
use gate_core::{BoxedPaymentStore, GateError, GateResult, RecordUpdate};
use gate_stripe::{CheckoutCompletedData, WebhookHandler};
use tracing::{info, warn};

/// Webhook handler writing completed checkouts back to the record store
pub struct RecordFulfillment {
    store: BoxedPaymentStore,
}

impl RecordFulfillment {
    pub fn new(store: BoxedPaymentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WebhookHandler for RecordFulfillment {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> GateResult<()> {
        let Some(record_id) = data.record_id() else {
            warn!(
                "Completed session {} carries no record id, nothing to update",
                data.session_id
            );
            return Ok(());
        };

        let update = RecordUpdate::customer(data.customer_email.clone(), data.customer_name.clone());
        match self.store.update(record_id, &update).await {
            Ok(()) => {}
            // Redelivery cannot create or rename the record, so acknowledge it.
            Err(GateError::RecordNotFound { .. } | GateError::InvalidRequest(_)) => {
                warn!(
                    "Completed session {} references unknown record {}",
                    data.session_id, record_id
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        info!(
            "Payment completed and record updated: record={}, session={}",
            record_id, data.session_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_core::{InMemoryStore, Order, PaymentRecord, PaymentStore, Product};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn completed(record_id: Option<&str>) -> CheckoutCompletedData {
        let mut metadata = HashMap::new();
        if let Some(id) = record_id {
            metadata.insert(gate_core::RECORD_ID_METADATA_KEY.to_string(), id.to_string());
        }
        CheckoutCompletedData {
            session_id: "cs_test_1".to_string(),
            customer_email: Some("a@b.com".to_string()),
            customer_name: Some("A".to_string()),
            metadata,
        }
    }

    async fn seeded() -> (Arc<InMemoryStore>, String) {
        let store = Arc::new(InMemoryStore::new());
        let order = Order::for_product(&Product::game_play_access());
        let record = PaymentRecord::new("rec_1", &order, "cs_test_1");
        store.create(&record).await.unwrap();
        (store, record.id)
    }

    #[tokio::test]
    async fn test_completion_sets_customer() {
        let (store, id) = seeded().await;
        let handler = RecordFulfillment::new(store.clone());

        handler.on_checkout_completed(completed(Some(&id))).await.unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.email.as_deref(), Some("a@b.com"));
        assert_eq!(record.name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_missing_record_id_is_noop() {
        let (store, id) = seeded().await;
        let handler = RecordFulfillment::new(store.clone());

        handler.on_checkout_completed(completed(None)).await.unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.email, None);
    }

    #[tokio::test]
    async fn test_unknown_record_is_acknowledged() {
        let (store, _) = seeded().await;
        let handler = RecordFulfillment::new(store.clone());

        handler
            .on_checkout_completed(completed(Some("missing")))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }
}
