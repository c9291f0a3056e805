//! # meter-stripe
//!
//! Stripe implementation of the `BillingGateway` seam.
//!
//! This crate provides:
//!
//! 1. **StripeBillingClient** - form-encoded calls against the Stripe REST API
//!    - Customers, payment methods, subscriptions
//!    - Upcoming invoice previews, invoices, invoice items
//!    - Products, metered tiered prices, usage records
//!
//! 2. **WebhookVerifier** - `Stripe-Signature` checking
//!
//! 3. **WebhookHandler** - typed dispatch of verified events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meter_stripe::{StripeBillingClient, StripeConfig};
//! use meter_core::BillingGateway;
//!
//! let client = StripeBillingClient::new(StripeConfig::new(secret_key))?;
//! let customer = client.create_customer("jenny@example.com").await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use meter_stripe::{dispatch_event, parse_event, WebhookHandler, WebhookVerifier};
//!
//! struct MyHandler;
//!
//! impl WebhookHandler for MyHandler {
//!     fn on_invoice_paid(&self, event: &BillingEvent) -> BillingResult<()> {
//!         // Provision access
//!         Ok(())
//!     }
//! }
//!
//! // In your webhook endpoint:
//! verifier.verify(&body, signature)?;
//! let event = parse_event(&body)?;
//! dispatch_event(&MyHandler, &event)?;
//! ```

pub mod client;
pub mod config;
pub mod form;
pub mod signature;
pub mod webhook;

// Re-exports
pub use client::StripeBillingClient;
pub use config::{StripeConfig, STRIPE_API_VERSION};
pub use form::FormParams;
pub use signature::{WebhookVerifier, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
pub use webhook::{
    dispatch_event, parse_event, LoggingWebhookHandler, WebhookHandler,
    SUBSCRIBED_WEBHOOK_EVENTS,
};
