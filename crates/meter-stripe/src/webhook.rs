//! # Stripe Webhook Handling
//!
//! Turns verified webhook payloads into `BillingEvent`s and routes them
//! to a `WebhookHandler`.

use chrono::{DateTime, Utc};
use meter_core::{BillingError, BillingEvent, BillingEventKind, BillingResult, DeletionOrigin};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: StripeEventData,
    #[serde(default)]
    request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

/// Whether an API request (rather than the platform itself) caused the event.
///
/// Older API versions send the request id as a bare string; newer ones send
/// `{ "id": ..., "idempotency_key": ... }` with a null id for automatic events.
fn request_initiated(request: &serde_json::Value) -> bool {
    match request {
        serde_json::Value::String(_) => true,
        serde_json::Value::Object(obj) => obj.get("id").is_some_and(|id| !id.is_null()),
        _ => false,
    }
}

/// Parse a webhook payload into a `BillingEvent`.
///
/// Call only after the signature has been verified.
pub fn parse_event(payload: &[u8]) -> BillingResult<BillingEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        BillingError::WebhookParse(format!("Failed to parse webhook: {}", e))
    })?;

    debug!("Parsed Stripe webhook: type={}", event.event_type);

    let kind = BillingEventKind::classify(&event.event_type, request_initiated(&event.request));

    Ok(BillingEvent {
        event_id: event.id,
        kind,
        object: event.data.object,
        created: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

/// Webhook event handler trait
///
/// Every method defaults to logging the event, so implementors override
/// only what they act on.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Called when an invoice is paid; provision access here
    fn on_invoice_paid(&self, event: &BillingEvent) -> BillingResult<()> {
        info!("Invoice paid: {:?}", event.object_id());
        Ok(())
    }

    /// Called when an invoice payment fails
    fn on_invoice_payment_failed(&self, event: &BillingEvent) -> BillingResult<()> {
        warn!("Invoice payment failed: {:?}", event.object_id());
        Ok(())
    }

    fn on_invoice_finalized(&self, event: &BillingEvent) -> BillingResult<()> {
        info!("Invoice finalized: {:?}", event.object_id());
        Ok(())
    }

    /// Called when a subscription is deleted
    fn on_subscription_deleted(
        &self,
        event: &BillingEvent,
        origin: DeletionOrigin,
    ) -> BillingResult<()> {
        match origin {
            DeletionOrigin::Requested => {
                info!("Subscription cancelled by request: {:?}", event.object_id())
            }
            DeletionOrigin::Automatic => {
                info!("Subscription cancelled automatically: {:?}", event.object_id())
            }
        }
        Ok(())
    }

    /// Called three days before a trial ends
    fn on_trial_will_end(&self, event: &BillingEvent) -> BillingResult<()> {
        info!("Trial will end: {:?}", event.object_id());
        Ok(())
    }

    /// Called for anything outside the handled set
    fn on_unhandled(&self, event: &BillingEvent) -> BillingResult<()> {
        warn!("Unhandled webhook event: {}", event.kind.type_name());
        Ok(())
    }
}

/// Default handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch an event to the matching handler method
pub fn dispatch_event(handler: &dyn WebhookHandler, event: &BillingEvent) -> BillingResult<()> {
    match &event.kind {
        BillingEventKind::InvoicePaid => handler.on_invoice_paid(event),
        BillingEventKind::InvoicePaymentFailed => handler.on_invoice_payment_failed(event),
        BillingEventKind::InvoiceFinalized => handler.on_invoice_finalized(event),
        BillingEventKind::SubscriptionDeleted { origin } => {
            handler.on_subscription_deleted(event, *origin)
        }
        BillingEventKind::TrialWillEnd => handler.on_trial_will_end(event),
        BillingEventKind::Unhandled(_) => handler.on_unhandled(event),
    }
}

/// Events to enable on the webhook endpoint
pub const SUBSCRIBED_WEBHOOK_EVENTS: &[&str] = &[
    "invoice.paid",
    "invoice.payment_failed",
    "invoice.finalized",
    "customer.subscription.deleted",
    "customer.subscription.trial_will_end",
];
