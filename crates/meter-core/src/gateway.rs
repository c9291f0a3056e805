//! # Billing Gateway Trait
//!
//! The seam between HTTP handlers and the payment platform. Every endpoint
//! calls through a `BillingGateway`; the Stripe adapter is the production
//! implementation and tests substitute an in-memory one.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            BillingGateway (trait)             │
//! │  ├── customers / payment methods              │
//! │  ├── subscriptions / upcoming invoices        │
//! │  ├── products / tiered prices                 │
//! │  ├── usage records                            │
//! │  └── invoice items / invoices                 │
//! └───────────────────────────────────────────────┘
//!                        ▲
//!           ┌────────────┴────────────┐
//!   ┌───────┴────────┐        ┌───────┴────────┐
//!   │ StripeBilling  │        │  test doubles  │
//!   │     Client     │        │                │
//!   └────────────────┘        └────────────────┘
//! ```
//!
//! Resources come back as the platform's own JSON so handlers can return
//! them to the client unchanged.

use crate::error::{BillingError, BillingResult};
use crate::params::{
    InvoiceItemParams, InvoiceParams, ProductParams, SubscriptionParams, SubscriptionUpdate,
    TieredPriceParams, UpcomingInvoiceParams,
};
use crate::usage::{IdempotencyKey, UsageRecordParams};
use async_trait::async_trait;
use std::sync::Arc;

/// A remote resource as returned by the platform
pub type Resource = serde_json::Value;

/// Operations the backend performs against the payment platform.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn create_customer(&self, email: &str) -> BillingResult<Resource>;

    /// Attach a payment method to a customer.
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> BillingResult<Resource>;

    /// Make a payment method the customer's default for invoices.
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<Resource>;

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> BillingResult<Resource>;

    async fn create_subscription(&self, params: &SubscriptionParams) -> BillingResult<Resource>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Resource>;

    async fn update_subscription(
        &self,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> BillingResult<Resource>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<Resource>;

    async fn retrieve_invoice(&self, invoice_id: &str, expand: &[&str]) -> BillingResult<Resource>;

    /// Preview the next invoice with the given item changes applied.
    async fn upcoming_invoice(&self, params: &UpcomingInvoiceParams) -> BillingResult<Resource>;

    async fn create_product(&self, params: &ProductParams) -> BillingResult<Resource>;

    async fn create_tiered_price(&self, params: &TieredPriceParams) -> BillingResult<Resource>;

    /// Report usage on a metered subscription item.
    async fn create_usage_record(
        &self,
        subscription_item_id: &str,
        record: &UsageRecordParams,
        idempotency_key: &IdempotencyKey,
    ) -> BillingResult<Resource>;

    async fn create_invoice_item(&self, params: &InvoiceItemParams) -> BillingResult<Resource>;

    async fn create_invoice(&self, params: &InvoiceParams) -> BillingResult<Resource>;

    async fn pay_invoice(&self, invoice_id: &str) -> BillingResult<Resource>;

    /// Provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedBillingGateway = Arc<dyn BillingGateway>;

/// Id of a resource
pub fn resource_id(resource: &Resource) -> BillingResult<&str> {
    resource
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BillingError::Serialization("resource has no id".to_string()))
}

/// Id of the first item of a subscription (`items.data[0].id`)
pub fn first_subscription_item(subscription: &Resource) -> BillingResult<&str> {
    subscription
        .pointer("/items/data/0/id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            BillingError::InvalidRequest("subscription has no items".to_string())
        })
}
