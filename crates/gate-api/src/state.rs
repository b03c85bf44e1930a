//! # Application State
//!
//! Configuration is read once at startup and never mutated; handlers receive
//! it through `AppState`.

use crate::token::AccessTokens;
use gate_core::{BoxedPaymentStore, BoxedPaymentStrategy, GateError, GateResult, InMemoryStore};
use gate_firestore::FirestoreStore;
use gate_stripe::StripeCheckoutStrategy;
use std::net::SocketAddr;
use std::sync::Arc;

/// Where payment records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local; records vanish on restart
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(GateError::Configuration(format!(
                "STORE_BACKEND must be firestore or memory, got {}",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Game front-end; payment success returns to `{game_url}/?userId=<id>`
    pub game_url: String,
    /// Where the hosted checkout page sends a customer who cancels
    pub cancel_url: String,
    /// Browser origins allowed to call the API
    pub allowed_origins: Vec<String>,
    /// Record store backend
    pub store_backend: StoreBackend,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> GateResult<Self> {
        dotenvy::dotenv().ok();

        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| GateError::Configuration(format!("PORT is not a port number: {}", p)))?,
            None => 4242,
        };

        let game_url = var("GAME_URL")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let cancel_url = var("CANCEL_URL").unwrap_or_else(|| format!("{}/cancel", game_url));

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![game_url.clone()],
        };

        let store_backend = match var("STORE_BACKEND") {
            Some(b) => b.parse()?,
            None => StoreBackend::Firestore,
        };

        let config = Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            game_url,
            cancel_url,
            allowed_origins,
            store_backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject URLs and origins the browser or Stripe would refuse
    pub fn validate(&self) -> GateResult<()> {
        let is_http = |s: &str| s.starts_with("http://") || s.starts_with("https://");

        if !is_http(&self.game_url) {
            return Err(GateError::Configuration(format!(
                "GAME_URL must be an http(s) URL: {}",
                self.game_url
            )));
        }
        if !is_http(&self.cancel_url) {
            return Err(GateError::Configuration(format!(
                "CANCEL_URL must be an http(s) URL: {}",
                self.cancel_url
            )));
        }
        if let Some(bad) = self.allowed_origins.iter().find(|o| !is_http(o)) {
            return Err(GateError::Configuration(format!(
                "ALLOWED_ORIGINS entry must be an http(s) origin: {}",
                bad
            )));
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> GateResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GateError::Configuration(format!("Invalid socket address: {}", e)))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout provider
    pub strategy: BoxedPaymentStrategy,
    /// Payment record store
    pub store: BoxedPaymentStore,
    /// Access token issuer/validator
    pub tokens: Arc<AccessTokens>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        strategy: BoxedPaymentStrategy,
        store: BoxedPaymentStore,
        tokens: AccessTokens,
    ) -> Self {
        Self {
            strategy,
            store,
            tokens: Arc::new(tokens),
            config,
        }
    }

    /// Build everything from environment variables
    pub fn from_env() -> GateResult<Self> {
        let config = AppConfig::from_env()?;

        let strategy = StripeCheckoutStrategy::from_env()?;

        let store: BoxedPaymentStore = match config.store_backend {
            StoreBackend::Firestore => Arc::new(FirestoreStore::from_env()?),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory record store; records are lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let tokens = AccessTokens::from_env()?;

        Ok(Self::new(config, Arc::new(strategy), store, tokens))
    }

    /// Success redirect for a record
    pub fn success_url(&self, record_id: &str) -> String {
        format!("{}/?userId={}", self.config.game_url, record_id)
    }

    /// Cancel redirect
    pub fn cancel_url(&self) -> &str {
        &self.config.cancel_url
    }
}
