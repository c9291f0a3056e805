//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the billing gateway, webhook plumbing, configuration, and demo fixtures.

use meter_core::{BoxedBillingGateway, DemoFixtures, PriceBook};
use meter_stripe::{
    LoggingWebhookHandler, StripeBillingClient, StripeConfig, WebhookHandler, WebhookVerifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Required configuration keys with the hint printed when one is absent
const REQUIRED_KEYS: &[(&str, &str)] = &[
    ("STRIPE_SECRET_KEY", "Add STRIPE_SECRET_KEY to your .env file."),
    (
        "STRIPE_PUBLISHABLE_KEY",
        "Add STRIPE_PUBLISHABLE_KEY to your .env file.",
    ),
    (
        "BASIC",
        "Add BASIC priceID to your .env file. See repo readme for setup instructions.",
    ),
    (
        "PREMIUM",
        "Add PREMIUM priceID to your .env file. See repo readme for setup instructions.",
    ),
    (
        "STATIC_DIR",
        "Add STATIC_DIR to your .env file. Please check the README for more details.",
    ),
    (
        "COMPTE_CONNECT_CLIENT_ID",
        "Add COMPTE_CONNECT_CLIENT_ID (the Connect destination account) to your .env file.",
    ),
    (
        "COMPTE_CUSTOMER_CLIENT_ID",
        "Add COMPTE_CUSTOMER_CLIENT_ID (the demo customer) to your .env file.",
    ),
];

const DEFAULT_FIXTURE_PATHS: [&str; 3] = [
    "config/demo.toml",
    "../config/demo.toml",
    "../../config/demo.toml",
];

/// A required configuration key that was absent or empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    pub key: &'static str,
    pub hint: &'static str,
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", key_names(.0))]
    MissingKeys(Vec<MissingKey>),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn key_names(keys: &[MissingKey]) -> String {
    keys.iter().map(|k| k.key).collect::<Vec<_>>().join(", ")
}

impl ConfigError {
    /// Lines to print before aborting: a general notice, then one per problem
    pub fn report(&self) -> Vec<String> {
        let mut lines = vec![
            "The .env file is not configured correctly. Follow the instructions in the readme to configure it.".to_string(),
            String::new(),
        ];
        match self {
            ConfigError::MissingKeys(keys) => {
                lines.extend(keys.iter().map(|k| k.hint.to_string()));
            }
            ConfigError::Invalid { .. } => lines.push(self.to_string()),
        }
        lines
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Stripe secret key
    pub secret_key: String,
    /// Publishable key handed to the browser
    pub publishable_key: String,
    /// Plan to price mapping
    pub prices: PriceBook,
    /// Client bundle directory
    pub static_dir: PathBuf,
    /// Connect destination for the demo platform subscription
    pub connect_account: String,
    /// Customer used by the fixed demo flows
    pub demo_customer: String,
    /// Webhook signing secret; webhooks are rejected without one
    pub webhook_secret: Option<String>,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Optional demo fixtures file
    pub fixtures_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from environment variables (after reading `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    ///
    /// Every missing required key is reported, not just the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<MissingKey> = REQUIRED_KEYS
            .iter()
            .filter(|(key, _)| get(key).is_none())
            .map(|&(key, hint)| MissingKey { key, hint })
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let required = |key: &'static str| get(key).unwrap_or_default();

        let prices = PriceBook::new(required("BASIC"), required("PREMIUM")).map_err(|e| {
            ConfigError::Invalid {
                key: "BASIC/PREMIUM",
                message: e.to_string(),
            }
        })?;

        let port = match get("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                message: format!("'{}' is not a port number", p),
            })?,
            None => 4242,
        };

        Ok(Self {
            secret_key: required("STRIPE_SECRET_KEY"),
            publishable_key: required("STRIPE_PUBLISHABLE_KEY"),
            prices,
            static_dir: PathBuf::from(required("STATIC_DIR")),
            connect_account: required("COMPTE_CONNECT_CLIENT_ID"),
            demo_customer: required("COMPTE_CUSTOMER_CLIENT_ID"),
            webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            fixtures_path: get("DEMO_FIXTURES_PATH").map(PathBuf::from),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "HOST",
                message: format!("'{}' is not a valid bind address", self.host),
            })
    }

    /// Check if using live Stripe keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Billing gateway every handler calls through
    pub gateway: BoxedBillingGateway,
    /// Demo product, price and invoice identifiers
    pub fixtures: Arc<DemoFixtures>,
    /// Present only when a webhook secret is configured
    pub verifier: Option<Arc<WebhookVerifier>>,
    /// Receives verified webhook events
    pub webhook_handler: Arc<dyn WebhookHandler>,
}

impl AppState {
    /// Create state backed by the Stripe API
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let fixtures = load_demo_fixtures(config.fixtures_path.as_deref())?;

        let client = StripeBillingClient::new(StripeConfig::new(&config.secret_key))
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::with_gateway(config, Arc::new(client), fixtures))
    }

    /// Create state around an arbitrary gateway
    pub fn with_gateway(
        config: AppConfig,
        gateway: BoxedBillingGateway,
        fixtures: DemoFixtures,
    ) -> Self {
        let verifier = config
            .webhook_secret
            .as_ref()
            .map(|secret| Arc::new(WebhookVerifier::new(secret)));

        Self {
            config: Arc::new(config),
            gateway,
            fixtures: Arc::new(fixtures),
            verifier,
            webhook_handler: Arc::new(LoggingWebhookHandler),
        }
    }

    /// Builder: replace the webhook handler
    pub fn with_webhook_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.webhook_handler = handler;
        self
    }
}

/// Load demo fixtures from an explicit path, a default location, or built-in defaults
pub fn load_demo_fixtures(explicit: Option<&Path>) -> anyhow::Result<DemoFixtures> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        return parse_fixtures(&content, &path.display().to_string());
    }

    for path in DEFAULT_FIXTURE_PATHS {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_fixtures(&content, path);
        }
    }

    tracing::info!("No demo fixtures file found, using built-in fixtures");
    Ok(DemoFixtures::default())
}

fn parse_fixtures(content: &str, source: &str) -> anyhow::Result<DemoFixtures> {
    let fixtures = DemoFixtures::from_toml(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", source, e))?;
    tracing::info!("Loaded demo fixtures from {}", source);
    Ok(fixtures)
}
