//! # gate-core
//!
//! Core types and traits for the playgate backend.
//!
//! This crate provides:
//! - `PaymentStrategy` trait for the checkout provider (Stripe)
//! - `PaymentStore` trait for the record store (Firestore, in-memory)
//! - `PaymentRecord` and `RecordUpdate` for the single stored entity
//! - `Order`, `LineItem`, and `CheckoutSession` for the checkout flow
//! - `GateError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use gate_core::{Order, Product, PaymentRecord, RECORD_ID_METADATA_KEY};
//!
//! let record_id = store.allocate_id();
//!
//! let order = Order::for_product(&Product::game_play_access())
//!     .with_metadata(RECORD_ID_METADATA_KEY, &record_id)
//!     .with_idempotency_key(&record_id);
//!
//! let session = strategy.create_checkout(&order, &success_url, &cancel_url).await?;
//! store.create(&PaymentRecord::new(record_id, &order, &session.session_id)).await?;
//! ```

pub mod error;
pub mod order;
pub mod product;
pub mod record;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use error::{GateError, GateResult};
pub use order::{
    CheckoutMode, CheckoutSession, LineItem, Order, WebhookEvent, WebhookEventType,
    RECORD_ID_METADATA_KEY,
};
pub use product::{Currency, Price, Product};
pub use record::{
    generate_record_id, validate_record_id, PaymentRecord, RecordId, RecordUpdate,
    MAX_RECORD_ID_BYTES,
};
pub use store::{BoxedPaymentStore, InMemoryStore, PaymentStore};
pub use strategy::{BoxedPaymentStrategy, PaymentStrategy};
