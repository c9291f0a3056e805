//! # Billing Error Types
//!
//! Typed error handling for the usage-billing backend.
//! All gateway operations return `Result<T, BillingError>`.

use thiserror::Error;

/// Core error type for all billing operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Plan identifier outside the known set
    #[error("Unknown plan: {plan}")]
    UnknownPlan { plan: String },

    /// Payment provider rejected the call
    #[error("{message}")]
    Provider {
        message: String,
        /// Stripe error type (`card_error`, `invalid_request_error`, ...)
        kind: Option<String>,
        code: Option<String>,
        decline_code: Option<String>,
        /// HTTP status returned by the provider
        status: u16,
    },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Endpoint is declared but has no behavior yet
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl BillingError {
    /// Build a provider error from a bare message (status 400, no codes)
    pub fn provider(message: impl Into<String>) -> Self {
        BillingError::Provider {
            message: message.into(),
            kind: None,
            code: None,
            decline_code: None,
            status: 400,
        }
    }

    /// Returns true if the provider declined a card
    pub fn is_card_error(&self) -> bool {
        match self {
            BillingError::Provider { kind, status, .. } => {
                kind.as_deref() == Some("card_error") || *status == 402
            }
            _ => false,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BillingError::Configuration(_) => 500,
            BillingError::InvalidRequest(_) => 400,
            BillingError::UnknownPlan { .. } => 400,
            BillingError::Provider { .. } if self.is_card_error() => 402,
            BillingError::Provider { .. } => 500,
            BillingError::Network(_) => 503,
            BillingError::WebhookVerification(_) => 400,
            BillingError::WebhookParse(_) => 400,
            BillingError::Serialization(_) => 500,
            BillingError::NotImplemented(_) => 501,
        }
    }
}

/// Result type alias for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
