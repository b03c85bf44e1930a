//! # Payment Store Trait
//!
//! Record create/read/update by id. The production backend is Firestore;
//! `InMemoryStore` backs local development and tests.

use crate::error::{GateError, GateResult};
use crate::record::{generate_record_id, PaymentRecord, RecordId, RecordUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Document-store operations used by the gate.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Allocate a fresh record id without writing anything.
    fn allocate_id(&self) -> RecordId {
        generate_record_id()
    }

    /// Write a new record under `record.id`.
    async fn create(&self, record: &PaymentRecord) -> GateResult<()>;

    /// Fetch a record, `None` if it does not exist.
    async fn get(&self, id: &str) -> GateResult<Option<PaymentRecord>>;

    /// Apply `update` to an existing record.
    ///
    /// Fails with `GateError::RecordNotFound` when no record has this id.
    async fn update(&self, id: &str, update: &RecordUpdate) -> GateResult<()>;

    /// Backend name (for logging).
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared store (dynamic dispatch)
pub type BoxedPaymentStore = Arc<dyn PaymentStore>;

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<RecordId, PaymentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record
    pub async fn records(&self) -> Vec<PaymentRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn create(&self, record: &PaymentRecord) -> GateResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(GateError::store(
                self.backend_name(),
                format!("Record already exists: {}", record.id),
            ));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> GateResult<Option<PaymentRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, update: &RecordUpdate) -> GateResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| GateError::RecordNotFound { id: id.to_string() })?;
        record.apply(update);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
