//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use meter_api::{create_router, AppConfig, AppState};
use meter_core::{
    BillingError, BillingEvent, BillingGateway, BillingResult, DeletionOrigin, DemoFixtures,
    IdempotencyKey, InvoiceItemParams, InvoiceParams, ProductParams, Resource,
    SubscriptionParams, SubscriptionUpdate, TieredPriceParams, UpcomingInvoiceParams,
    UsageRecordParams,
};
use meter_stripe::WebhookHandler;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// One call made against the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateCustomer(String),
    AttachPaymentMethod {
        payment_method: String,
        customer: String,
    },
    SetDefaultPaymentMethod {
        customer: String,
        payment_method: String,
    },
    RetrievePaymentMethod(String),
    CreateSubscription(SubscriptionParams),
    RetrieveSubscription(String),
    UpdateSubscription(String, SubscriptionUpdate),
    CancelSubscription(String),
    RetrieveInvoice(String, Vec<String>),
    UpcomingInvoice(UpcomingInvoiceParams),
    CreateProduct(ProductParams),
    CreateTieredPrice(TieredPriceParams),
    CreateUsageRecord {
        item: String,
        record: UsageRecordParams,
        key: IdempotencyKey,
    },
    CreateInvoiceItem(InvoiceItemParams),
    CreateInvoice(InvoiceParams),
    PayInvoice(String),
}

/// Gateway-wide failure applied to every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    /// Provider answers with a non-card error
    Upstream,
    /// Provider is unreachable
    Network,
}

/// In-memory gateway that records every call and answers with canned JSON
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    pub decline_attach: bool,
    pub fail_usage: bool,
    pub fail_prices: bool,
    pub fail_with: Option<Failure>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declining() -> Self {
        Self {
            decline_attach: true,
            ..Self::default()
        }
    }

    pub fn failing_usage() -> Self {
        Self {
            fail_usage: true,
            ..Self::default()
        }
    }

    pub fn failing_prices() -> Self {
        Self {
            fail_prices: true,
            ..Self::default()
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            fail_with: Some(failure),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Log the call, then fail it if a gateway-wide failure is set
    fn record(&self, call: Call) -> BillingResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.fail_with {
            Some(Failure::Upstream) => Err(BillingError::Provider {
                message: "No such customer: 'cus_missing'".to_string(),
                kind: Some("invalid_request_error".to_string()),
                code: Some("resource_missing".to_string()),
                decline_code: None,
                status: 404,
            }),
            Some(Failure::Network) => Err(BillingError::Network(
                "connection refused".to_string(),
            )),
            None => Ok(()),
        }
    }
}

pub fn card_declined() -> BillingError {
    BillingError::Provider {
        message: "Your card was declined.".to_string(),
        kind: Some("card_error".to_string()),
        code: Some("card_declined".to_string()),
        decline_code: Some("generic_decline".to_string()),
        status: 402,
    }
}

#[async_trait]
impl BillingGateway for RecordingGateway {
    async fn create_customer(&self, email: &str) -> BillingResult<Resource> {
        self.record(Call::CreateCustomer(email.to_string()))?;
        Ok(json!({ "id": "cus_new", "object": "customer", "email": email }))
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> BillingResult<Resource> {
        self.record(Call::AttachPaymentMethod {
            payment_method: payment_method_id.to_string(),
            customer: customer_id.to_string(),
        })?;
        if self.decline_attach {
            return Err(card_declined());
        }
        Ok(json!({ "id": payment_method_id, "customer": customer_id }))
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<Resource> {
        self.record(Call::SetDefaultPaymentMethod {
            customer: customer_id.to_string(),
            payment_method: payment_method_id.to_string(),
        })?;
        Ok(json!({
            "id": customer_id,
            "invoice_settings": { "default_payment_method": payment_method_id }
        }))
    }

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> BillingResult<Resource> {
        self.record(Call::RetrievePaymentMethod(payment_method_id.to_string()))?;
        Ok(json!({ "id": payment_method_id, "card": { "last4": "4242" } }))
    }

    async fn create_subscription(&self, params: &SubscriptionParams) -> BillingResult<Resource> {
        self.record(Call::CreateSubscription(params.clone()))?;
        Ok(json!({ "id": "sub_new", "status": "active", "customer": params.customer }))
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Resource> {
        self.record(Call::RetrieveSubscription(subscription_id.to_string()))?;
        Ok(json!({
            "id": subscription_id,
            "items": { "data": [ { "id": "si_first" }, { "id": "si_second" } ] }
        }))
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> BillingResult<Resource> {
        self.record(Call::UpdateSubscription(
            subscription_id.to_string(),
            update.clone(),
        ))?;
        Ok(json!({ "id": subscription_id, "cancel_at_period_end": false }))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<Resource> {
        self.record(Call::CancelSubscription(subscription_id.to_string()))?;
        Ok(json!({ "id": subscription_id, "status": "canceled" }))
    }

    async fn retrieve_invoice(&self, invoice_id: &str, expand: &[&str]) -> BillingResult<Resource> {
        self.record(Call::RetrieveInvoice(
            invoice_id.to_string(),
            expand.iter().map(|s| s.to_string()).collect(),
        ))?;
        Ok(json!({ "id": invoice_id, "payment_intent": { "id": "pi_1" } }))
    }

    async fn upcoming_invoice(&self, params: &UpcomingInvoiceParams) -> BillingResult<Resource> {
        self.record(Call::UpcomingInvoice(params.clone()))?;
        Ok(json!({ "object": "invoice", "amount_due": 1200 }))
    }

    async fn create_product(&self, params: &ProductParams) -> BillingResult<Resource> {
        self.record(Call::CreateProduct(params.clone()))?;
        Ok(json!({ "id": "prod_new", "name": params.name }))
    }

    async fn create_tiered_price(&self, params: &TieredPriceParams) -> BillingResult<Resource> {
        self.record(Call::CreateTieredPrice(params.clone()))?;
        if self.fail_prices {
            return Err(BillingError::provider("Invalid tiers"));
        }
        Ok(json!({ "id": "price_new", "product": params.product }))
    }

    async fn create_usage_record(
        &self,
        subscription_item_id: &str,
        record: &UsageRecordParams,
        idempotency_key: &IdempotencyKey,
    ) -> BillingResult<Resource> {
        self.record(Call::CreateUsageRecord {
            item: subscription_item_id.to_string(),
            record: record.clone(),
            key: idempotency_key.clone(),
        })?;
        if self.fail_usage {
            return Err(BillingError::Network("connection reset".to_string()));
        }
        Ok(json!({ "id": "mbur_1", "quantity": record.quantity }))
    }

    async fn create_invoice_item(&self, params: &InvoiceItemParams) -> BillingResult<Resource> {
        self.record(Call::CreateInvoiceItem(params.clone()))?;
        Ok(json!({ "id": "ii_1", "price": { "id": params.price } }))
    }

    async fn create_invoice(&self, params: &InvoiceParams) -> BillingResult<Resource> {
        self.record(Call::CreateInvoice(params.clone()))?;
        Ok(json!({ "id": "in_new", "status": "draft" }))
    }

    async fn pay_invoice(&self, invoice_id: &str) -> BillingResult<Resource> {
        self.record(Call::PayInvoice(invoice_id.to_string()))?;
        Ok(json!({ "id": invoice_id, "status": "paid" }))
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Counts dispatches; optionally fails every one
#[derive(Default)]
pub struct CountingHandler {
    pub dispatched: AtomicUsize,
    pub fail: bool,
    pub deletions: Mutex<Vec<DeletionOrigin>>,
}

impl CountingHandler {
    pub fn count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    fn hit(&self) -> BillingResult<()> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BillingError::provider("handler exploded"));
        }
        Ok(())
    }
}

impl WebhookHandler for CountingHandler {
    fn on_invoice_paid(&self, _event: &BillingEvent) -> BillingResult<()> {
        self.hit()
    }

    fn on_invoice_payment_failed(&self, _event: &BillingEvent) -> BillingResult<()> {
        self.hit()
    }

    fn on_invoice_finalized(&self, _event: &BillingEvent) -> BillingResult<()> {
        self.hit()
    }

    fn on_subscription_deleted(
        &self,
        _event: &BillingEvent,
        origin: DeletionOrigin,
    ) -> BillingResult<()> {
        self.deletions.lock().unwrap().push(origin);
        self.hit()
    }

    fn on_trial_will_end(&self, _event: &BillingEvent) -> BillingResult<()> {
        self.hit()
    }

    fn on_unhandled(&self, _event: &BillingEvent) -> BillingResult<()> {
        self.hit()
    }
}

pub fn test_env(static_dir: &Path) -> HashMap<&'static str, String> {
    HashMap::from([
        ("STRIPE_SECRET_KEY", "sk_test_abc".to_string()),
        ("STRIPE_PUBLISHABLE_KEY", "pk_test_publishable".to_string()),
        ("BASIC", "price_basic".to_string()),
        ("PREMIUM", "price_premium".to_string()),
        ("STATIC_DIR", static_dir.display().to_string()),
        ("COMPTE_CONNECT_CLIENT_ID", "acct_connect".to_string()),
        ("COMPTE_CUSTOMER_CLIENT_ID", "cus_demo".to_string()),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET.to_string()),
    ])
}

pub fn test_config(static_dir: &Path) -> AppConfig {
    let env = test_env(static_dir);
    AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

/// Client bundle directory with a single `index.html`
pub fn static_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "usage-billing-{}-{}",
        name,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>usage billing</h1>").unwrap();
    std::fs::write(dir.join("script.js"), "console.log('client');").unwrap();
    dir
}

pub fn test_state(gateway: Arc<RecordingGateway>, name: &str) -> AppState {
    AppState::with_gateway(
        test_config(&static_dir(name)),
        gateway,
        DemoFixtures::default(),
    )
}

pub fn test_router(gateway: Arc<RecordingGateway>, name: &str) -> axum::Router {
    create_router(test_state(gateway, name))
}
