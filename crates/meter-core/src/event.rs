//! # Billing Events
//!
//! Asynchronous events delivered by the payment platform's webhook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who caused a subscription deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionOrigin {
    /// Cancelled through an API request (e.g. `cancel-subscription`)
    Requested,
    /// Cancelled by the platform according to subscription settings
    Automatic,
}

/// Event kinds this service reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEventKind {
    /// `invoice.paid`
    InvoicePaid,
    /// `invoice.payment_failed`
    InvoicePaymentFailed,
    /// `invoice.finalized`
    InvoiceFinalized,
    /// `customer.subscription.deleted`
    SubscriptionDeleted { origin: DeletionOrigin },
    /// `customer.subscription.trial_will_end`
    TrialWillEnd,
    /// Anything else, carrying the raw type name
    Unhandled(String),
}

impl BillingEventKind {
    /// Classify a raw event type; `request_initiated` only matters for deletions
    pub fn classify(event_type: &str, request_initiated: bool) -> Self {
        match event_type {
            "invoice.paid" => BillingEventKind::InvoicePaid,
            "invoice.payment_failed" => BillingEventKind::InvoicePaymentFailed,
            "invoice.finalized" => BillingEventKind::InvoiceFinalized,
            "customer.subscription.deleted" => BillingEventKind::SubscriptionDeleted {
                origin: if request_initiated {
                    DeletionOrigin::Requested
                } else {
                    DeletionOrigin::Automatic
                },
            },
            "customer.subscription.trial_will_end" => BillingEventKind::TrialWillEnd,
            other => BillingEventKind::Unhandled(other.to_string()),
        }
    }

    /// Platform event type name
    pub fn type_name(&self) -> &str {
        match self {
            BillingEventKind::InvoicePaid => "invoice.paid",
            BillingEventKind::InvoicePaymentFailed => "invoice.payment_failed",
            BillingEventKind::InvoiceFinalized => "invoice.finalized",
            BillingEventKind::SubscriptionDeleted { .. } => "customer.subscription.deleted",
            BillingEventKind::TrialWillEnd => "customer.subscription.trial_will_end",
            BillingEventKind::Unhandled(other) => other,
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Event ID from provider
    pub event_id: String,

    pub kind: BillingEventKind,

    /// The resource the event is about (invoice, subscription, ...)
    pub object: serde_json::Value,

    pub created: DateTime<Utc>,
}

impl BillingEvent {
    /// Id of the embedded resource, if it has one
    pub fn object_id(&self) -> Option<&str> {
        self.object.get("id").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_types() {
        assert_eq!(
            BillingEventKind::classify("invoice.paid", false),
            BillingEventKind::InvoicePaid
        );
        assert_eq!(
            BillingEventKind::classify("invoice.finalized", true),
            BillingEventKind::InvoiceFinalized
        );
        assert_eq!(
            BillingEventKind::classify("customer.subscription.trial_will_end", false),
            BillingEventKind::TrialWillEnd
        );
    }

    #[test]
    fn test_classify_deletion_origin() {
        assert_eq!(
            BillingEventKind::classify("customer.subscription.deleted", true),
            BillingEventKind::SubscriptionDeleted {
                origin: DeletionOrigin::Requested
            }
        );
        assert_eq!(
            BillingEventKind::classify("customer.subscription.deleted", false),
            BillingEventKind::SubscriptionDeleted {
                origin: DeletionOrigin::Automatic
            }
        );
    }

    #[test]
    fn test_unhandled_keeps_type_name() {
        let kind = BillingEventKind::classify("charge.refunded", false);
        assert_eq!(kind, BillingEventKind::Unhandled("charge.refunded".into()));
        assert_eq!(kind.type_name(), "charge.refunded");
    }
}
