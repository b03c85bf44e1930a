//! # Access Tokens
//!
//! Short-lived HS256 tokens proving the holder went through the gate. They
//! carry no record identity, only a fixed purpose and the issue time.

use chrono::{DateTime, Duration, Utc};
use gate_core::{GateError, GateResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Purpose claim of every access token
pub const PLAY_ACCESS_PURPOSE: &str = "play_access";

/// Lifetime of an access token
pub const ACCESS_TOKEN_TTL_SECS: i64 = 5 * 60;

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub purpose: String,
    /// Issue time in milliseconds since the Unix epoch
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates access tokens with a shared secret
pub struct AccessTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl AccessTokens {
    pub fn new(secret: &str) -> GateResult<Self> {
        if secret.is_empty() {
            return Err(GateError::Configuration(
                "JWT_SECRET_KEY must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        })
    }

    /// Load the secret from `JWT_SECRET_KEY`
    pub fn from_env() -> GateResult<Self> {
        dotenvy::dotenv().ok();
        let secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| GateError::Configuration("JWT_SECRET_KEY not set".to_string()))?;
        Self::new(&secret)
    }

    /// Issue a token valid from now
    pub fn issue(&self) -> GateResult<String> {
        self.issue_at(Utc::now())
    }

    /// Issue a token as if at `issued_at`
    pub fn issue_at(&self, issued_at: DateTime<Utc>) -> GateResult<String> {
        let claims = AccessClaims {
            purpose: PLAY_ACCESS_PURPOSE.to_string(),
            created_at: issued_at.timestamp_millis(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GateError::TokenSigning(e.to_string()))
    }

    /// Check signature, expiry and purpose
    pub fn validate(&self, token: &str) -> GateResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            warn!("Access token rejected: {}", e);
            GateError::InvalidToken(e.to_string())
        })?;

        if data.claims.purpose != PLAY_ACCESS_PURPOSE {
            warn!("Access token rejected: purpose {:?}", data.claims.purpose);
            return Err(GateError::InvalidToken(format!(
                "unexpected purpose {}",
                data.claims.purpose
            )));
        }

        Ok(data.claims)
    }
}
