//! # Form Encoding
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
//! keys for nested values (`items[0][price]`, `expand[]`). This module
//! turns the core parameter types into those key/value lists.

use meter_core::{
    InvoiceItemParams, InvoiceParams, ProductParams, SubscriptionParams, SubscriptionUpdate,
    TieredPriceParams, UpcomingInvoiceParams, UpcomingItem, UsageRecordParams,
};
use std::collections::BTreeMap;

/// Ordered list of form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a field
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    /// Append a field if the value is present
    pub fn push_opt<V: ToString>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Append `prefix[key]` for every metadata entry
    pub fn push_map(&mut self, prefix: &str, map: &BTreeMap<String, String>) -> &mut Self {
        for (key, value) in map {
            self.push(format!("{}[{}]", prefix, key), value);
        }
        self
    }

    /// Append `expand[]` entries
    pub fn push_expand<S: AsRef<str>>(&mut self, paths: &[S]) -> &mut Self {
        for path in paths {
            self.push("expand[]", path.as_ref());
        }
        self
    }

    /// Value of the first field with this key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn customer_form(email: &str) -> FormParams {
    let mut form = FormParams::new();
    form.push("email", email);
    form
}

pub fn default_payment_method_form(payment_method_id: &str) -> FormParams {
    let mut form = FormParams::new();
    form.push("invoice_settings[default_payment_method]", payment_method_id);
    form
}

pub fn subscription_form(params: &SubscriptionParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("customer", &params.customer);

    for (i, price) in params.prices.iter().enumerate() {
        form.push(format!("items[{}][price]", i), price);
    }

    form.push_opt("description", params.description.as_ref())
        .push_map("metadata", &params.metadata)
        .push_opt("payment_behavior", params.payment_behavior.map(|b| b.as_str()))
        .push_opt("cancel_at_period_end", params.cancel_at_period_end)
        .push_opt("cancel_at", params.cancel_at.map(|t| t.timestamp()))
        .push_opt("application_fee_percent", params.application_fee_percent)
        .push_opt("collection_method", params.collection_method.map(|m| m.as_str()))
        .push_opt("proration_behavior", params.proration_behavior.map(|b| b.as_str()))
        .push_opt(
            "transfer_data[destination]",
            params.transfer_destination.as_ref(),
        )
        .push_expand(&params.expand);

    form
}

pub fn subscription_update_form(update: &SubscriptionUpdate) -> FormParams {
    let mut form = FormParams::new();
    form.push_opt("cancel_at_period_end", update.cancel_at_period_end);

    for (i, change) in update.items.iter().enumerate() {
        form.push(format!("items[{}][id]", i), &change.item_id);
        form.push(format!("items[{}][price]", i), &change.price);
    }

    form
}

/// Upcoming invoice preview is a GET; these become query parameters
pub fn upcoming_invoice_query(params: &UpcomingInvoiceParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("customer", &params.customer)
        .push("subscription", &params.subscription)
        .push("subscription_prorate", params.prorate);

    for (i, item) in params.items.iter().enumerate() {
        match item {
            UpcomingItem::Remove {
                item_id,
                clear_usage,
            } => {
                form.push(format!("subscription_items[{}][id]", i), item_id);
                form.push(format!("subscription_items[{}][clear_usage]", i), clear_usage);
                form.push(format!("subscription_items[{}][deleted]", i), true);
            }
            UpcomingItem::Add { price } => {
                form.push(format!("subscription_items[{}][price]", i), price);
                form.push(format!("subscription_items[{}][deleted]", i), false);
            }
        }
    }

    form
}

pub fn product_form(params: &ProductParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("name", &params.name)
        .push_opt("description", params.description.as_ref())
        .push_map("metadata", &params.metadata);
    form
}

/// Metered usage summed per period, graduated tiers
pub fn tiered_price_form(params: &TieredPriceParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("product", &params.product)
        .push("currency", &params.currency)
        .push("recurring[interval]", params.interval.as_str())
        .push("recurring[usage_type]", "metered")
        .push("recurring[aggregate_usage]", "sum")
        .push("billing_scheme", "tiered")
        .push("tiers_mode", "graduated");

    for (i, tier) in params.tiers.iter().enumerate() {
        form.push(format!("tiers[{}][up_to]", i), tier.up_to.to_param())
            .push_opt(format!("tiers[{}][flat_amount]", i), tier.flat_amount)
            .push_opt(format!("tiers[{}][unit_amount]", i), tier.unit_amount)
            .push_opt(
                format!("tiers[{}][unit_amount_decimal]", i),
                tier.unit_amount_decimal.as_ref(),
            );
    }

    form.push_map("metadata", &params.metadata);
    form
}

pub fn usage_record_form(record: &UsageRecordParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("quantity", record.quantity)
        .push("timestamp", record.timestamp.timestamp())
        .push("action", record.action.as_str());
    form
}

pub fn invoice_item_form(params: &InvoiceItemParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("customer", &params.customer)
        .push("price", &params.price);
    form
}

pub fn invoice_form(params: &InvoiceParams) -> FormParams {
    let mut form = FormParams::new();
    form.push("customer", &params.customer)
        .push_opt("auto_advance", params.auto_advance)
        .push_opt("collection_method", params.collection_method.map(|m| m.as_str()));

    for (i, coupon) in params.coupons.iter().enumerate() {
        form.push(format!("discounts[{}][coupon]", i), coupon);
    }

    form
}
