//! # Request Handlers
//!
//! Axum request handlers for the gate API. Each handler makes at most a few
//! sequential calls to the checkout provider or the record store.

use crate::fulfillment::RecordFulfillment;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use gate_core::{
    validate_record_id, GateError, GateResult, Order, PaymentRecord, Product, RecordUpdate,
    RECORD_ID_METADATA_KEY,
};
use gate_stripe::dispatch_webhook_event;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Body of `/api/validate-token`
#[derive(Debug, Default, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `/api/check-status` and `/api/mark-played`
#[derive(Debug, Default, Deserialize)]
pub struct RecordRequest {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

/// Create checkout response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCheckoutResponse {
    /// Hosted checkout URL (redirect user here)
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub played: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message, status.as_u16())))
}

fn gate_error_to_response(err: GateError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &err {
        GateError::WebhookVerificationFailed(reason) | GateError::WebhookParseError(reason) => {
            format!("Webhook Error: {}", reason)
        }
        other => other.to_string(),
    };
    error_response(status, message)
}

/// Parse an optional JSON body; an empty body is the default value
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> GateResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GateError::InvalidRequest(format!("Invalid JSON body: {}", e)))
}

/// Request body accepted as JSON or as `application/x-www-form-urlencoded`.
/// A missing body is the default value.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                gate_error_to_response(GateError::InvalidRequest(format!(
                    "Invalid form body: {}",
                    e.body_text()
                )))
            })?;
            return Ok(JsonOrForm(value));
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            gate_error_to_response(GateError::InvalidRequest(e.body_text()))
        })?;
        parse_body(&body).map(JsonOrForm).map_err(gate_error_to_response)
    }
}

fn required(value: Option<String>, message: &str) -> GateResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GateError::InvalidRequest(message.to_string()))
}

/// The `userId` of a record request, present and usable as a document id
fn record_id(request: RecordRequest) -> GateResult<String> {
    let user_id = required(request.user_id, "userId required")?;
    validate_record_id(&user_id)?;
    Ok(user_id)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "playgate",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Allocate a record, open a hosted checkout for it, then persist the record
#[instrument(skip(state))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let record_id = state.store.allocate_id();

    let order = Order::for_product(&Product::game_play_access())
        .with_metadata(RECORD_ID_METADATA_KEY, &record_id)
        .with_idempotency_key(&record_id);

    info!(
        "Creating checkout: record={}, total={}",
        record_id,
        order.total().display()
    );

    let session = state
        .strategy
        .create_checkout(&order, &state.success_url(&record_id), state.cancel_url())
        .await
        .map_err(|e| {
            error!("Error creating checkout session: {}", e);
            gate_error_to_response(e)
        })?;

    let record = PaymentRecord::new(record_id, &order, &session.session_id);

    if let Err(e) = state.store.create(&record).await {
        error!("Error saving record {}: {}", record.id, e);

        // Expire the session so the customer cannot pay for a record that does not exist.
        match state.strategy.cancel_checkout(&session.session_id).await {
            Ok(()) => warn!("Expired orphaned checkout session {}", session.session_id),
            Err(cancel_err) => error!(
                "Orphaned checkout session {} could not be expired: {}",
                session.session_id, cancel_err
            ),
        }

        return Err(gate_error_to_response(e));
    }

    info!(
        "Created checkout session {} for record {}",
        session.session_id, record.id
    );

    Ok(Json(CreateCheckoutResponse {
        url: session.checkout_url,
    }))
}

/// Handle a Stripe webhook delivery
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook signature verification failed: missing header");
            gate_error_to_response(GateError::WebhookVerificationFailed(
                "No stripe-signature header value was provided".to_string(),
            ))
        })?;

    let event = state
        .strategy
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            warn!("Webhook signature verification failed: {}", e);
            gate_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    let handler = RecordFulfillment::new(state.store.clone());
    dispatch_webhook_event(&handler, event).await.map_err(|e| {
        error!("Webhook handler error: {}", e);
        gate_error_to_response(e)
    })?;

    Ok(Json(WebhookAck { received: true }))
}

/// Issue a five-minute access token
#[instrument(skip(state))]
pub async fn generate_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.issue().map_err(|e| {
        error!("Error signing access token: {}", e);
        gate_error_to_response(e)
    })?;

    Ok(Json(TokenResponse { token }))
}

/// Check an access token's signature and expiry
#[instrument(skip(state, request))]
pub async fn validate_token(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    let token = required(request.token, "Token required").map_err(gate_error_to_response)?;

    state
        .tokens
        .validate(&token)
        .map_err(gate_error_to_response)?;

    Ok(Json(ValidateTokenResponse { valid: true }))
}

/// Report whether a record's game has been played
#[instrument(skip(state, request))]
pub async fn check_status(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<RecordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let user_id = record_id(request).map_err(gate_error_to_response)?;

    let record = state.store.get(&user_id).await.map_err(|e| {
        error!("Error reading record {}: {}", user_id, e);
        gate_error_to_response(e)
    })?;

    match record {
        Some(record) => Ok(Json(StatusResponse {
            played: record.played,
        })),
        None => Err(error_response(StatusCode::NOT_FOUND, "Record not found")),
    }
}

/// Mark a record's game as played
#[instrument(skip(state, request))]
pub async fn mark_played(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<RecordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user_id = record_id(request).map_err(gate_error_to_response)?;

    state
        .store
        .update(&user_id, &RecordUpdate::Played)
        .await
        .map_err(|e| {
            error!("Error marking record {} played: {}", user_id, e);
            gate_error_to_response(e)
        })?;

    info!("Record {} marked played", user_id);
    Ok(Json(SuccessResponse { success: true }))
}
