//! # Payment Records
//!
//! The single stored entity. One record per checkout attempt, keyed by an
//! id allocated before the checkout session exists.

use crate::error::{GateError, GateResult};
use crate::order::Order;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Opaque record identifier
pub type RecordId = String;

const RECORD_ID_LEN: usize = 20;

/// Longest document id Firestore accepts, in bytes
pub const MAX_RECORD_ID_BYTES: usize = 1500;

/// Generate a 20-character alphanumeric id, the shape Firestore uses for
/// auto-generated document ids.
pub fn generate_record_id() -> RecordId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECORD_ID_LEN)
        .map(char::from)
        .collect()
}

/// Reject ids that cannot name a single document in the `payments`
/// collection. Ids arrive from request bodies and end up in a URL path.
pub fn validate_record_id(id: &str) -> GateResult<()> {
    let invalid = |reason: &str| -> GateResult<()> {
        Err(GateError::InvalidRequest(format!("Invalid userId: {}", reason)))
    };

    if id.is_empty() {
        return invalid("empty");
    }
    if id.len() > MAX_RECORD_ID_BYTES {
        return invalid("too long");
    }
    if id == "." || id == ".." {
        return invalid("reserved");
    }
    if id.starts_with("__") && id.ends_with("__") {
        return invalid("reserved");
    }
    if id.contains(['/', '?', '#']) || id.chars().any(char::is_control) {
        return invalid("forbidden character");
    }
    Ok(())
}

/// A payment record as stored in the `payments` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Document id (not stored as a field)
    #[serde(skip)]
    pub id: RecordId,

    /// Amount in minor currency units
    pub amount: i64,

    /// Whether the gated game has been played
    pub played: bool,

    /// Creation time, milliseconds since the Unix epoch
    pub created_at: i64,

    /// Customer email, filled in by the completion webhook
    pub email: Option<String>,

    /// Customer name, filled in by the completion webhook
    pub name: Option<String>,

    /// Checkout session correlating this record with the processor
    #[serde(rename = "stripeSessionId")]
    pub payment_session_id: String,
}

impl PaymentRecord {
    /// Initial state of a record for a freshly created checkout session
    pub fn new(id: impl Into<RecordId>, order: &Order, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount: order.total().amount,
            played: false,
            created_at: Utc::now().timestamp_millis(),
            email: None,
            name: None,
            payment_session_id: session_id.into(),
        }
    }

    /// Apply an update in place
    pub fn apply(&mut self, update: &RecordUpdate) {
        match update {
            RecordUpdate::Customer { email, name } => {
                self.email = email.clone();
                self.name = name.clone();
            }
            RecordUpdate::Played => self.played = true,
        }
    }
}

/// The mutations a record may undergo after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    /// Customer details reported by a completed checkout
    Customer {
        email: Option<String>,
        name: Option<String>,
    },
    /// The gated content was consumed
    Played,
}

impl RecordUpdate {
    /// Build a customer update, treating empty strings as absent
    pub fn customer(email: Option<String>, name: Option<String>) -> Self {
        RecordUpdate::Customer {
            email: email.filter(|s| !s.is_empty()),
            name: name.filter(|s| !s.is_empty()),
        }
    }

    /// Stored field names touched by this update
    pub fn field_paths(&self) -> &'static [&'static str] {
        match self {
            RecordUpdate::Customer { .. } => &["email", "name"],
            RecordUpdate::Played => &["played"],
        }
    }
}
