//! # Stripe Configuration
//!
//! Configuration for the Stripe integration. Values come from the
//! application's startup configuration; nothing here reads the environment.

/// Stripe API version the request/response shapes are written against
pub const STRIPE_API_VERSION: &str = "2020-08-27";

/// Default Stripe API base URL
pub const STRIPE_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Per-request timeout
    pub timeout: std::time::Duration,
}

impl StripeConfig {
    /// Create config for a secret key with default endpoint and version
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base_url: STRIPE_API_BASE_URL.to_string(),
            api_version: STRIPE_API_VERSION.to_string(),
            timeout: std::time::Duration::from_secs(30),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL for an API path such as `/v1/customers`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}
