//! # Firestore Values
//!
//! The REST API wraps every field in a single-key object naming its type,
//! e.g. `{"integerValue": "5000"}` or `{"nullValue": null}`. 64-bit integers
//! travel as decimal strings.

use gate_core::{GateError, GateResult, PaymentRecord, RecordUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed Firestore value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    StringValue(String),
    TimestampValue(String),
}

impl Value {
    pub fn integer(v: i64) -> Self {
        Value::IntegerValue(v.to_string())
    }

    pub fn optional_string(v: Option<&str>) -> Self {
        match v {
            Some(s) => Value::StringValue(s.to_string()),
            None => Value::NullValue(()),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(d) => Some(*d as i64),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    fn into_string(self) -> Option<String> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }
}

/// A Firestore document as written to the REST API
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// A Firestore document as read back. Fields stay raw so that value types
/// this crate never writes (maps, arrays, references) do not fail the read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl StoredDocument {
    /// A field decoded as a known value type, `None` if absent or foreign
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields
            .get(name)
            .and_then(|raw| Value::deserialize(raw).ok())
    }
}

/// Encode every stored field of a record
pub fn record_to_document(record: &PaymentRecord) -> Document {
    let fields = HashMap::from([
        ("amount".to_string(), Value::integer(record.amount)),
        ("played".to_string(), Value::BooleanValue(record.played)),
        ("createdAt".to_string(), Value::integer(record.created_at)),
        ("email".to_string(), Value::optional_string(record.email.as_deref())),
        ("name".to_string(), Value::optional_string(record.name.as_deref())),
        (
            "stripeSessionId".to_string(),
            Value::StringValue(record.payment_session_id.clone()),
        ),
    ]);

    Document { name: None, fields }
}

/// Encode only the fields an update touches
pub fn update_to_document(update: &RecordUpdate) -> Document {
    let fields = match update {
        RecordUpdate::Customer { email, name } => HashMap::from([
            ("email".to_string(), Value::optional_string(email.as_deref())),
            ("name".to_string(), Value::optional_string(name.as_deref())),
        ]),
        RecordUpdate::Played => HashMap::from([("played".to_string(), Value::BooleanValue(true))]),
    };

    Document { name: None, fields }
}

/// Decode a stored document into a record with the given id.
///
/// Absent optional fields fall back to their initial values; a missing or
/// mistyped `amount` is an error.
pub fn document_to_record(id: &str, document: &StoredDocument) -> GateResult<PaymentRecord> {
    let field = |name: &str| document.field(name);

    let amount = field("amount").and_then(|v| v.as_i64()).ok_or_else(|| {
        GateError::Serialization(format!("Record {} has no integer amount", id))
    })?;

    Ok(PaymentRecord {
        id: id.to_string(),
        amount,
        played: field("played").and_then(|v| v.as_bool()).unwrap_or(false),
        created_at: field("createdAt").and_then(|v| v.as_i64()).unwrap_or(0),
        email: field("email").and_then(Value::into_string),
        name: field("name").and_then(Value::into_string),
        payment_session_id: field("stripeSessionId")
            .and_then(Value::into_string)
            .unwrap_or_default(),
    })
}
