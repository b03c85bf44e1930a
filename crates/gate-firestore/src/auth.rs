//! # Service-Account OAuth
//!
//! Exchanges an RS256-signed assertion for a short-lived access token
//! (`urn:ietf:params:oauth:grant-type:jwt-bearer`) and caches it until shortly
//! before expiry.

use crate::config::ServiceAccountKey;
use chrono::{DateTime, Duration, Utc};
use gate_core::{GateError, GateResult};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Mints and caches OAuth access tokens for a service account
pub struct AccessTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(key: ServiceAccountKey, client: Client) -> GateResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            GateError::Configuration(format!("Service-account private key is invalid: {}", e))
        })?;

        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> GateResult<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| GateError::TokenSigning(format!("OAuth assertion: {}", e)))
    }

    /// A valid access token, fetching a new one if the cached one is stale
    #[instrument(skip(self), fields(client_email = %self.key.client_email))]
    pub async fn token(&self) -> GateResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("OAuth token exchange failed: status={}, body={}", status, body);
            return Err(GateError::store(
                "firestore",
                format!("OAuth token exchange failed: HTTP {}: {}", status, body),
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            GateError::Serialization(format!("Failed to parse OAuth token response: {}", e))
        })?;

        debug!("Fetched access token, expires in {}s", token.expires_in);

        let fresh = CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
