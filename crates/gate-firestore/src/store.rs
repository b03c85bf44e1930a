//! # Firestore Payment Store
//!
//! `PaymentStore` over the Firestore v1 REST API.

use crate::auth::AccessTokenSource;
use crate::config::{Credentials, FirestoreConfig};
use crate::value::{document_to_record, record_to_document, update_to_document, StoredDocument};
use async_trait::async_trait;
use gate_core::{
    validate_record_id, GateError, GateResult, PaymentRecord, PaymentStore, RecordUpdate,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument};

const BACKEND: &str = "firestore";

#[derive(Debug, Deserialize)]
struct FirestoreErrorResponse {
    error: FirestoreError,
}

#[derive(Debug, Deserialize)]
struct FirestoreError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Firestore-backed record store
pub struct FirestoreStore {
    config: FirestoreConfig,
    client: Client,
    tokens: Option<AccessTokenSource>,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> GateResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let tokens = match &config.credentials {
            Credentials::ServiceAccount(key) => {
                Some(AccessTokenSource::new(key.clone(), client.clone())?)
            }
            Credentials::Emulator => None,
        };

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> GateResult<Self> {
        Self::new(FirestoreConfig::from_env()?)
    }

    async fn authorize(&self, request: RequestBuilder) -> GateResult<RequestBuilder> {
        let token = match &self.tokens {
            Some(source) => source.token().await?,
            None => "owner".to_string(),
        };
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> GateResult<Response> {
        self.authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))
    }

    /// Turn a non-2xx response into an error.
    ///
    /// A 404 is read as a missing record only for `NotFound::Document`, and
    /// only when Firestore blames the document rather than the database or
    /// project ("... does not exist").
    async fn check(response: Response, not_found: NotFound<'_>) -> GateResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        let parsed = serde_json::from_str::<FirestoreErrorResponse>(&body)
            .ok()
            .map(|e| e.error);

        if let NotFound::Document(id) = not_found {
            if parsed.as_ref().is_some_and(|e| is_missing_document(status, e)) {
                return Err(GateError::RecordNotFound { id: id.to_string() });
            }
        }

        error!("Firestore API error: status={}, body={}", status, body);

        let message = parsed
            .map(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
        Err(GateError::store(BACKEND, message))
    }
}

/// How `check` reads a 404
#[derive(Debug, Clone, Copy)]
enum NotFound<'a> {
    /// The named document may legitimately be absent
    Document(&'a str),
    /// Any 404 is an upstream failure
    Failure,
}

fn is_missing_document(status: StatusCode, error: &FirestoreError) -> bool {
    let not_found =
        status == StatusCode::NOT_FOUND || error.status.as_deref() == Some("NOT_FOUND");
    not_found && !error.message.contains("does not exist")
}

#[async_trait]
impl PaymentStore for FirestoreStore {
    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn create(&self, record: &PaymentRecord) -> GateResult<()> {
        validate_record_id(&record.id)?;

        let request = self
            .client
            .post(self.config.collection_url())
            .query(&[("documentId", record.id.as_str())])
            .json(&record_to_document(record));

        let response = self.send(request).await?;
        Self::check(response, NotFound::Failure).await?;
        debug!("Created payment record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> GateResult<Option<PaymentRecord>> {
        let request = self.client.get(self.config.document_url(id)?);
        let response = self.send(request).await?;

        let body = match Self::check(response, NotFound::Document(id)).await {
            Ok(body) => body,
            Err(GateError::RecordNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let document: StoredDocument = serde_json::from_str(&body).map_err(|e| {
            GateError::Serialization(format!("Failed to parse Firestore document: {}", e))
        })?;

        document_to_record(id, &document).map(Some)
    }

    #[instrument(skip(self, update), fields(fields = ?update.field_paths()))]
    async fn update(&self, id: &str, update: &RecordUpdate) -> GateResult<()> {
        let mut query: Vec<(&str, &str)> = update
            .field_paths()
            .iter()
            .map(|path| ("updateMask.fieldPaths", *path))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let request = self
            .client
            .patch(self.config.document_url(id)?)
            .query(&query)
            .json(&update_to_document(update));

        let response = self.send(request).await?;
        Self::check(response, NotFound::Document(id)).await?;
        debug!("Updated payment record");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_core::{Order, Product};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/demo-playgate/databases/(default)/documents/payments";

    fn store(server: &MockServer) -> FirestoreStore {
        FirestoreStore::new(FirestoreConfig::emulator("demo-playgate", server.uri())).unwrap()
    }

    fn record() -> PaymentRecord {
        let order = Order::for_product(&Product::game_play_access());
        PaymentRecord::new("rec_1", &order, "cs_test_1")
    }

    #[tokio::test]
    async fn test_create_sends_all_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DOCS))
            .and(query_param("documentId", "rec_1"))
            .and(header("Authorization", "Bearer owner"))
            .and(body_partial_json(json!({
                "fields": {
                    "amount": { "integerValue": "5000" },
                    "played": { "booleanValue": false },
                    "email": { "nullValue": null },
                    "name": { "nullValue": null },
                    "stripeSessionId": { "stringValue": "cs_test_1" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).create(&record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/nope", DOCS)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        assert!(store(&server).get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_existing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/rec_1", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo-playgate/databases/(default)/documents/payments/rec_1",
                "fields": {
                    "amount": { "integerValue": "5000" },
                    "played": { "booleanValue": false },
                    "createdAt": { "integerValue": "1700000000000" },
                    "email": { "nullValue": null },
                    "name": { "nullValue": null },
                    "stripeSessionId": { "stringValue": "cs_test_1" }
                }
            })))
            .mount(&server)
            .await;

        let fetched = store(&server).get("rec_1").await.unwrap().unwrap();
        assert_eq!(fetched.id, "rec_1");
        assert!(!fetched.played);
    }

    #[tokio::test]
    async fn test_update_uses_mask_and_precondition() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/rec_1", DOCS)))
            .and(query_param("updateMask.fieldPaths", "played"))
            .and(query_param("currentDocument.exists", "true"))
            .and(body_partial_json(json!({
                "fields": { "played": { "booleanValue": true } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .update("rec_1", &RecordUpdate::Played)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/nope", DOCS)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "No document to update", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .update("nope", &RecordUpdate::Played)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_message_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DOCS))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Missing or insufficient permissions.",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let err = store(&server).create(&record()).await.unwrap_err();
        assert!(matches!(err, GateError::StoreError { .. }));
        assert!(err.to_string().contains("Missing or insufficient permissions."));
    }

    #[tokio::test]
    async fn test_create_on_missing_database_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DOCS))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "The database (default) does not exist for project demo-playgate",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let err = store(&server).create(&record()).await.unwrap_err();
        assert!(matches!(err, GateError::StoreError { .. }));
        assert!(err.to_string().contains("The database (default) does not exist"));
    }

    #[tokio::test]
    async fn test_get_on_missing_database_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/rec_1", DOCS)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "The database (default) does not exist for project demo-playgate",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let err = store(&server).get("rec_1").await.unwrap_err();
        assert!(matches!(err, GateError::StoreError { .. }));
    }

    #[tokio::test]
    async fn test_path_escaping_ids_never_reach_firestore() {
        let server = MockServer::start().await;
        let store = store(&server);

        for id in ["../users/admin", "X?updateMask.fieldPaths=amount", "X#"] {
            let err = store.update(id, &RecordUpdate::Played).await.unwrap_err();
            assert!(matches!(err, GateError::InvalidRequest(_)), "{}", id);

            let err = store.get(id).await.unwrap_err();
            assert!(matches!(err, GateError::InvalidRequest(_)), "{}", id);
        }

        let mut bad = record();
        bad.id = "../users/admin".to_string();
        assert!(matches!(
            store.create(&bad).await,
            Err(GateError::InvalidRequest(_))
        ));

        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
