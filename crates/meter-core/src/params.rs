//! # Request Parameters
//!
//! Provider-agnostic parameter types for the billing calls the API makes.
//! Gateways translate these into their own wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the provider collects payment for invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMethod {
    ChargeAutomatically,
    SendInvoice,
}

impl CollectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMethod::ChargeAutomatically => "charge_automatically",
            CollectionMethod::SendInvoice => "send_invoice",
        }
    }
}

/// What happens when the first payment of a subscription cannot complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBehavior {
    AllowIncomplete,
    DefaultIncomplete,
    ErrorIfIncomplete,
}

impl PaymentBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentBehavior::AllowIncomplete => "allow_incomplete",
            PaymentBehavior::DefaultIncomplete => "default_incomplete",
            PaymentBehavior::ErrorIfIncomplete => "error_if_incomplete",
        }
    }
}

/// Proration handling when subscription terms change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationBehavior {
    CreateProrations,
    AlwaysInvoice,
    None,
}

impl ProrationBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProrationBehavior::CreateProrations => "create_prorations",
            ProrationBehavior::AlwaysInvoice => "always_invoice",
            ProrationBehavior::None => "none",
        }
    }
}

/// Parameters for creating a subscription
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubscriptionParams {
    pub customer: String,
    /// Price ids, one subscription item each
    pub prices: Vec<String>,
    /// Related objects to expand in the response
    pub expand: Vec<String>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub payment_behavior: Option<PaymentBehavior>,
    pub cancel_at_period_end: Option<bool>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub application_fee_percent: Option<f64>,
    pub collection_method: Option<CollectionMethod>,
    pub proration_behavior: Option<ProrationBehavior>,
    /// Connected account receiving the transfer
    pub transfer_destination: Option<String>,
}

impl SubscriptionParams {
    /// Single-price subscription for a customer
    pub fn new(customer: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            prices: vec![price.into()],
            ..Default::default()
        }
    }

    /// Builder: expand a related object in the response
    pub fn with_expand(mut self, path: impl Into<String>) -> Self {
        self.expand.push(path.into());
        self
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Replacement of one subscription item's price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPriceChange {
    pub item_id: String,
    pub price: String,
}

/// Parameters for updating an existing subscription
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionUpdate {
    pub cancel_at_period_end: Option<bool>,
    pub items: Vec<ItemPriceChange>,
}

impl SubscriptionUpdate {
    /// Move one item to a new price and keep the subscription running
    pub fn change_price(item_id: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            cancel_at_period_end: Some(false),
            items: vec![ItemPriceChange {
                item_id: item_id.into(),
                price: price.into(),
            }],
        }
    }
}

/// An item change previewed on the upcoming invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpcomingItem {
    /// Drop an existing item, optionally discarding its reported usage
    Remove { item_id: String, clear_usage: bool },
    /// Add a new item on a price
    Add { price: String },
}

/// Parameters for previewing the next invoice of a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingInvoiceParams {
    pub customer: String,
    pub subscription: String,
    pub prorate: bool,
    pub items: Vec<UpcomingItem>,
}

impl UpcomingInvoiceParams {
    /// Preview swapping `item_id` for a new price, with proration
    pub fn swap_price(
        customer: impl Into<String>,
        subscription: impl Into<String>,
        item_id: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            customer: customer.into(),
            subscription: subscription.into(),
            prorate: true,
            items: vec![
                UpcomingItem::Remove {
                    item_id: item_id.into(),
                    clear_usage: true,
                },
                UpcomingItem::Add {
                    price: price.into(),
                },
            ],
        }
    }
}

/// Parameters for creating a product
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Recurring interval of a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringInterval {
    Day,
    Week,
    Month,
    Year,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringInterval::Day => "day",
            RecurringInterval::Week => "week",
            RecurringInterval::Month => "month",
            RecurringInterval::Year => "year",
        }
    }
}

/// Upper bound of a pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTierBound", into = "RawTierBound")]
pub enum TierBound {
    Units(u64),
    Inf,
}

impl TierBound {
    /// Wire value (`"inf"` for the open-ended tier)
    pub fn to_param(&self) -> String {
        match self {
            TierBound::Units(n) => n.to_string(),
            TierBound::Inf => "inf".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTierBound {
    Units(u64),
    Text(String),
}

impl TryFrom<RawTierBound> for TierBound {
    type Error = String;

    fn try_from(raw: RawTierBound) -> Result<Self, Self::Error> {
        match raw {
            RawTierBound::Units(n) => Ok(TierBound::Units(n)),
            RawTierBound::Text(s) if s == "inf" => Ok(TierBound::Inf),
            RawTierBound::Text(s) => Err(format!("expected a unit count or \"inf\", got {:?}", s)),
        }
    }
}

impl From<TierBound> for RawTierBound {
    fn from(bound: TierBound) -> Self {
        match bound {
            TierBound::Units(n) => RawTierBound::Units(n),
            TierBound::Inf => RawTierBound::Text("inf".to_string()),
        }
    }
}

/// One band of a tiered price; amounts are in the currency's smallest unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub up_to: TierBound,
    #[serde(default)]
    pub flat_amount: Option<i64>,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub unit_amount_decimal: Option<String>,
}

/// Parameters for a metered, graduated, tiered price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredPriceParams {
    /// Product id; filled in once the product exists
    #[serde(default)]
    pub product: String,
    pub currency: String,
    pub interval: RecurringInterval,
    pub tiers: Vec<PriceTier>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TieredPriceParams {
    /// Same price attached to `product`
    pub fn for_product(&self, product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            ..self.clone()
        }
    }
}

/// Parameters for a pending invoice item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceItemParams {
    pub customer: String,
    pub price: String,
}

/// Parameters for creating an invoice from pending items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceParams {
    pub customer: String,
    pub auto_advance: Option<bool>,
    pub collection_method: Option<CollectionMethod>,
    /// Coupon ids applied as discounts
    pub coupons: Vec<String>,
}
