//! # Stripe Billing Client
//!
//! `BillingGateway` implementation over the Stripe REST API.
//! Every call is a single request; there is no retry layer.

use crate::config::StripeConfig;
use crate::form::{self, FormParams};
use async_trait::async_trait;
use meter_core::{
    BillingError, BillingGateway, BillingResult, IdempotencyKey, InvoiceItemParams,
    InvoiceParams, ProductParams, Resource, SubscriptionParams, SubscriptionUpdate,
    TieredPriceParams, UpcomingInvoiceParams, UsageRecordParams,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// Stripe-backed billing gateway
pub struct StripeBillingClient {
    config: StripeConfig,
    client: Client,
}

impl StripeBillingClient {
    /// Create a new client with a pooled HTTP connection
    pub fn new(config: StripeConfig) -> BillingResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                BillingError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.config.endpoint(path))
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    async fn post(&self, path: &str, form: FormParams) -> BillingResult<Resource> {
        let builder = self.request(Method::POST, path).form(form.as_slice());
        self.send(builder).await
    }

    async fn get(&self, path: &str, query: FormParams) -> BillingResult<Resource> {
        let mut builder = self.request(Method::GET, path);
        if !query.is_empty() {
            builder = builder.query(query.as_slice());
        }
        self.send(builder).await
    }

    async fn send(&self, builder: RequestBuilder) -> BillingResult<Resource> {
        let response = builder
            .send()
            .await
            .map_err(|e| BillingError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BillingError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(decode_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            BillingError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl BillingGateway for StripeBillingClient {
    #[instrument(skip(self, email))]
    async fn create_customer(&self, email: &str) -> BillingResult<Resource> {
        self.post("/v1/customers", form::customer_form(email)).await
    }

    #[instrument(skip(self))]
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> BillingResult<Resource> {
        let mut form = FormParams::new();
        form.push("customer", customer_id);
        self.post(
            &format!(
                "/v1/payment_methods/{}/attach",
                path_segment(payment_method_id)?
            ),
            form,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<Resource> {
        self.post(
            &format!("/v1/customers/{}", path_segment(customer_id)?),
            form::default_payment_method_form(payment_method_id),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_method(&self, payment_method_id: &str) -> BillingResult<Resource> {
        self.get(
            &format!("/v1/payment_methods/{}", path_segment(payment_method_id)?),
            FormParams::new(),
        )
        .await
    }

    #[instrument(skip(self, params), fields(customer = %params.customer))]
    async fn create_subscription(&self, params: &SubscriptionParams) -> BillingResult<Resource> {
        debug!("Creating subscription with {} item(s)", params.prices.len());
        self.post("/v1/subscriptions", form::subscription_form(params))
            .await
    }

    #[instrument(skip(self))]
    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Resource> {
        self.get(
            &format!("/v1/subscriptions/{}", path_segment(subscription_id)?),
            FormParams::new(),
        )
        .await
    }

    #[instrument(skip(self, update))]
    async fn update_subscription(
        &self,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> BillingResult<Resource> {
        self.post(
            &format!("/v1/subscriptions/{}", path_segment(subscription_id)?),
            form::subscription_update_form(update),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<Resource> {
        let builder = self.request(
            Method::DELETE,
            &format!("/v1/subscriptions/{}", path_segment(subscription_id)?),
        );
        self.send(builder).await
    }

    #[instrument(skip(self))]
    async fn retrieve_invoice(&self, invoice_id: &str, expand: &[&str]) -> BillingResult<Resource> {
        let mut query = FormParams::new();
        query.push_expand(expand);
        let path = format!("/v1/invoices/{}", path_segment(invoice_id)?);
        self.get(&path, query).await
    }

    #[instrument(skip(self, params), fields(subscription = %params.subscription))]
    async fn upcoming_invoice(&self, params: &UpcomingInvoiceParams) -> BillingResult<Resource> {
        self.get(
            "/v1/invoices/upcoming",
            form::upcoming_invoice_query(params),
        )
        .await
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_product(&self, params: &ProductParams) -> BillingResult<Resource> {
        self.post("/v1/products", form::product_form(params)).await
    }

    #[instrument(skip(self, params), fields(product = %params.product))]
    async fn create_tiered_price(&self, params: &TieredPriceParams) -> BillingResult<Resource> {
        self.post("/v1/prices", form::tiered_price_form(params)).await
    }

    #[instrument(skip(self, record), fields(quantity = record.quantity))]
    async fn create_usage_record(
        &self,
        subscription_item_id: &str,
        record: &UsageRecordParams,
        idempotency_key: &IdempotencyKey,
    ) -> BillingResult<Resource> {
        let form = form::usage_record_form(record);
        let builder = self
            .request(
                Method::POST,
                &format!(
                    "/v1/subscription_items/{}/usage_records",
                    path_segment(subscription_item_id)?
                ),
            )
            .header("Idempotency-Key", idempotency_key.as_str())
            .form(form.as_slice());
        self.send(builder).await
    }

    #[instrument(skip(self, params), fields(customer = %params.customer))]
    async fn create_invoice_item(&self, params: &InvoiceItemParams) -> BillingResult<Resource> {
        self.post("/v1/invoiceitems", form::invoice_item_form(params))
            .await
    }

    #[instrument(skip(self, params), fields(customer = %params.customer))]
    async fn create_invoice(&self, params: &InvoiceParams) -> BillingResult<Resource> {
        self.post("/v1/invoices", form::invoice_form(params)).await
    }

    #[instrument(skip(self))]
    async fn pay_invoice(&self, invoice_id: &str) -> BillingResult<Resource> {
        let path = format!("/v1/invoices/{}/pay", path_segment(invoice_id)?);
        self.post(&path, FormParams::new()).await
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

/// Percent-encode an object id for use as a single path segment
///
/// Ids arrive from client request bodies. Dot segments are rejected since
/// URL normalization would resolve them against the resource path.
fn path_segment(id: &str) -> BillingResult<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(BillingError::InvalidRequest(format!(
            "Invalid object id: {:?}",
            id
        )));
    }
    Ok(urlencoding::encode(id).into_owned())
}

fn decode_error(status: u16, body: &str) -> BillingError {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(response) => BillingError::Provider {
            message: response
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {}", status)),
            kind: response.error.kind,
            code: response.error.code,
            decline_code: response.error.decline_code,
            status,
        },
        Err(_) => BillingError::Provider {
            message: format!("HTTP {}: {}", status, body),
            kind: None,
            code: None,
            decline_code: None,
            status,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::{DemoCatalog, SubscriptionParams, UsageAction};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StripeBillingClient {
        let config = StripeConfig::new("sk_test_abc123").with_api_base_url(server.uri());
        StripeBillingClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_customer_sends_form_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header("authorization", "Bearer sk_test_abc123"))
            .and(header("stripe-version", "2020-08-27"))
            .and(body_string_contains("email=jenny%40example.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "cus_123", "object": "customer" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let customer = client_for(&server)
            .create_customer("jenny@example.com")
            .await
            .unwrap();

        assert_eq!(customer["id"], "cus_123");
    }

    #[tokio::test]
    async fn test_card_error_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_methods/pm_card_chargeDeclined/attach"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "decline_code": "generic_decline",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .attach_payment_method("pm_card_chargeDeclined", "cus_123")
            .await
            .unwrap_err();

        assert!(err.is_card_error());
        assert_eq!(err.status_code(), 402);
        assert_eq!(err.to_string(), "Your card was declined.");
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/sub_missing"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .retrieve_subscription("sub_missing")
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Provider { status: 500, .. }));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_usage_record_carries_idempotency_key() {
        let server = MockServer::start().await;
        let key = IdempotencyKey::from("idem-test-1".to_string());

        Mock::given(method("POST"))
            .and(path("/v1/subscription_items/si_123/usage_records"))
            .and(header("idempotency-key", "idem-test-1"))
            .and(body_string_contains("quantity=42"))
            .and(body_string_contains("action=set"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "mbur_1", "quantity": 42 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let record = UsageRecordParams::set_now(42);
        assert_eq!(record.action, UsageAction::Set);

        let usage = client_for(&server)
            .create_usage_record("si_123", &record, &key)
            .await
            .unwrap();

        assert_eq!(usage["quantity"], 42);
    }

    #[tokio::test]
    async fn test_create_subscription_and_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/subscriptions"))
            .and(body_string_contains("customer=cus_123"))
            .and(body_string_contains("price_basic"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "sub_1", "status": "active" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/subscriptions/sub_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "sub_1", "status": "canceled" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let created = client
            .create_subscription(&SubscriptionParams::new("cus_123", "price_basic"))
            .await
            .unwrap();
        assert_eq!(created["status"], "active");

        let cancelled = client.cancel_subscription("sub_1").await.unwrap();
        assert_eq!(cancelled["status"], "canceled");
    }

    #[tokio::test]
    async fn test_retrieve_invoice_expands() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/invoices/in_1"))
            .and(query_param("expand[]", "payment_intent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "in_1",
                "payment_intent": { "id": "pi_1" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let invoice = client_for(&server)
            .retrieve_invoice("in_1", &["payment_intent"])
            .await
            .unwrap();

        assert_eq!(invoice["payment_intent"]["id"], "pi_1");
    }

    #[tokio::test]
    async fn test_create_tiered_price() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/prices"))
            .and(body_string_contains("product=prod_1"))
            .and(body_string_contains("tiers_mode=graduated"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "price_1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let price = DemoCatalog::default().price.for_product("prod_1");
        let created = client_for(&server)
            .create_tiered_price(&price)
            .await
            .unwrap();

        assert_eq!(created["id"], "price_1");
    }

    #[tokio::test]
    async fn test_network_error() {
        let config = StripeConfig::new("sk_test_abc123").with_api_base_url("http://127.0.0.1:1");
        let client = StripeBillingClient::new(config).unwrap();

        let err = client.retrieve_payment_method("pm_1").await.unwrap_err();
        assert!(matches!(err, BillingError::Network(_)));
    }

    #[tokio::test]
    async fn test_object_ids_stay_in_their_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "deleted": true })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "sub_1" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .cancel_subscription("../customers/cus_victim")
            .await
            .unwrap();
        client
            .retrieve_subscription("sub_1?expand[]=customer")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url.path(),
            "/v1/subscriptions/..%2Fcustomers%2Fcus_victim"
        );
        assert_eq!(
            requests[1].url.path(),
            "/v1/subscriptions/sub_1%3Fexpand%5B%5D%3Dcustomer"
        );
        assert_eq!(requests[1].url.query(), None);
    }

    #[tokio::test]
    async fn test_dot_segment_ids_rejected_before_sending() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        for id in ["", ".", ".."] {
            let err = client.cancel_subscription(id).await.unwrap_err();
            assert!(matches!(err, BillingError::InvalidRequest(_)), "{:?}", id);
        }
        let err = client.pay_invoice("..").await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
