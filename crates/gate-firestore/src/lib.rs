//! # gate-firestore
//!
//! Cloud Firestore backend for playgate payment records, spoken over the
//! Firestore v1 REST API with `reqwest`.
//!
//! - **FirestoreStore** implements `gate_core::PaymentStore`
//! - **AccessTokenSource** mints OAuth tokens from a service-account key
//! - **value** maps records to Firestore's typed field encoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gate_firestore::FirestoreStore;
//! use gate_core::PaymentStore;
//!
//! // GOOGLE_CREDENTIALS_BASE64 or FIRESTORE_EMULATOR_HOST must be set
//! let store = FirestoreStore::from_env()?;
//! let record = store.get("AbCdEf0123456789wxyz").await?;
//! ```

pub mod auth;
pub mod config;
pub mod store;
pub mod value;

// Re-exports
pub use auth::AccessTokenSource;
pub use config::{Credentials, FirestoreConfig, ServiceAccountKey, PAYMENTS_COLLECTION};
pub use store::FirestoreStore;
