//! # meter-core
//!
//! Core types and traits for the usage-billing backend.
//!
//! This crate provides:
//! - `BillingGateway` trait for the payment platform seam
//! - `Plan` and `PriceBook` for resolving client plan ids to prices
//! - Parameter types for subscriptions, invoices, products and tiered prices
//! - `UsageRecordParams` and `IdempotencyKey` for metered usage
//! - `DemoFixtures` for the fixed demo flows
//! - `BillingEvent` for verified webhook events
//! - `BillingError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use meter_core::{BillingGateway, PriceBook, SubscriptionParams, SubscriptionUpdate};
//!
//! let prices = PriceBook::new("price_basic", "price_premium")?;
//! let price = prices.resolve("PREMIUM")?;
//!
//! let subscription = gateway
//!     .create_subscription(&SubscriptionParams::new("cus_123", price))
//!     .await?;
//! ```

pub mod error;
pub mod event;
pub mod fixtures;
pub mod gateway;
pub mod params;
pub mod plan;
pub mod usage;

// Re-exports for convenience
pub use error::{BillingError, BillingResult};
pub use event::{BillingEvent, BillingEventKind, DeletionOrigin};
pub use fixtures::{ConnectSubscriptionFixture, DemoCatalog, DemoFixtures};
pub use gateway::{
    first_subscription_item, resource_id, BillingGateway, BoxedBillingGateway, Resource,
};
pub use params::{
    CollectionMethod, InvoiceItemParams, InvoiceParams, ItemPriceChange, PaymentBehavior,
    PriceTier, ProductParams, ProrationBehavior, RecurringInterval, SubscriptionParams,
    SubscriptionUpdate, TierBound, TieredPriceParams, UpcomingInvoiceParams, UpcomingItem,
};
pub use plan::{Plan, PriceBook};
pub use usage::{IdempotencyKey, UsageAction, UsageRecordParams};
