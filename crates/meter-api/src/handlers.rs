//! # Request Handlers
//!
//! Axum request handlers for the billing API.
//! Each handler calls through the `BillingGateway` and returns the platform's
//! JSON unchanged, except where noted.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use meter_core::{
    first_subscription_item, resource_id, BillingError, CollectionMethod, IdempotencyKey,
    InvoiceItemParams, InvoiceParams, PaymentBehavior, ProrationBehavior, Resource,
    SubscriptionParams, SubscriptionUpdate, UpcomingInvoiceParams, UsageRecordParams,
};
use meter_stripe::{dispatch_event, parse_event, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    pub payment_method_id: String,
    /// Plan identifier (`BASIC` / `PREMIUM`)
    pub price_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInvoiceRequest {
    pub customer_id: String,
    pub payment_method_id: String,
    pub invoice_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveUpcomingInvoiceRequest {
    pub subscription_id: String,
    pub customer_id: String,
    /// Plan identifier
    pub new_price_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionRequest {
    pub subscription_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub subscription_id: String,
    /// Plan identifier
    pub new_price_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UseProductRequest {
    /// Minutes consumed this period
    pub minutes: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievePaymentMethodRequest {
    pub payment_method_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportUsageRequest {
    #[serde(default)]
    pub number: serde_json::Value,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiResult = Result<Json<Resource>, Response>;

fn billing_error_to_response(err: BillingError) -> Response {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if let BillingError::Provider {
        code: Some(provider_code),
        ..
    } = &err
    {
        response = response.with_details(provider_code.clone());
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
        .into_response()
}

fn upstream_failure(operation: &str) -> impl Fn(BillingError) -> Response + '_ {
    move |err| {
        error!("{} failed: {}", operation, err);
        billing_error_to_response(err)
    }
}

fn payment_required(body: serde_json::Value) -> Response {
    (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "usage-billing",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Publishable key for the browser
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "publishableKey": state.config.publishable_key }))
}

#[instrument(skip(state, request))]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> ApiResult {
    let customer = state
        .gateway
        .create_customer(&request.email)
        .await
        .map_err(upstream_failure("Create customer"))?;

    info!("Created customer {:?}", customer.get("id"));
    Ok(Json(json!({ "customer": customer })))
}

/// Attach the card, make it the default, then subscribe to the plan's price
#[instrument(skip(state, request), fields(customer = %request.customer_id, plan = %request.price_id))]
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> ApiResult {
    let price = state
        .config
        .prices
        .resolve(&request.price_id)
        .map_err(billing_error_to_response)?;

    if let Err(err) = state
        .gateway
        .attach_payment_method(&request.payment_method_id, &request.customer_id)
        .await
    {
        warn!("Payment method attach failed: {}", err);
        return Err(payment_required(json!({
            "error": { "message": err.to_string() }
        })));
    }

    state
        .gateway
        .set_default_payment_method(&request.customer_id, &request.payment_method_id)
        .await
        .map_err(upstream_failure("Set default payment method"))?;

    let params = SubscriptionParams::new(&request.customer_id, price)
        .with_expand("latest_invoice.payment_intent")
        .with_expand("pending_setup_intent");

    let subscription = state
        .gateway
        .create_subscription(&params)
        .await
        .map_err(upstream_failure("Create subscription"))?;

    info!("Created subscription {:?}", subscription.get("id"));
    Ok(Json(subscription))
}

/// Swap in a new card and return the invoice with its payment intent
#[instrument(skip(state, request), fields(invoice = %request.invoice_id))]
pub async fn retry_invoice(
    State(state): State<AppState>,
    Json(request): Json<RetryInvoiceRequest>,
) -> ApiResult {
    let card_update = async {
        state
            .gateway
            .attach_payment_method(&request.payment_method_id, &request.customer_id)
            .await?;
        state
            .gateway
            .set_default_payment_method(&request.customer_id, &request.payment_method_id)
            .await
    };

    if let Err(err) = card_update.await {
        warn!("Card update for retry failed: {}", err);
        return Err(payment_required(json!({
            "result": { "error": { "message": err.to_string() } }
        })));
    }

    let invoice = state
        .gateway
        .retrieve_invoice(&request.invoice_id, &["payment_intent"])
        .await
        .map_err(upstream_failure("Retrieve invoice"))?;

    Ok(Json(invoice))
}

/// Preview the prorated invoice for switching to another plan
#[instrument(skip(state, request), fields(subscription = %request.subscription_id))]
pub async fn retrieve_upcoming_invoice(
    State(state): State<AppState>,
    Json(request): Json<RetrieveUpcomingInvoiceRequest>,
) -> ApiResult {
    let price = state
        .config
        .prices
        .resolve(&request.new_price_id)
        .map_err(billing_error_to_response)?;

    let subscription = state
        .gateway
        .retrieve_subscription(&request.subscription_id)
        .await
        .map_err(upstream_failure("Retrieve subscription"))?;
    let item = first_subscription_item(&subscription).map_err(billing_error_to_response)?;

    let params = UpcomingInvoiceParams::swap_price(
        &request.customer_id,
        &request.subscription_id,
        item,
        price,
    );

    let invoice = state
        .gateway
        .upcoming_invoice(&params)
        .await
        .map_err(upstream_failure("Upcoming invoice"))?;

    Ok(Json(invoice))
}

#[instrument(skip(state, request), fields(subscription = %request.subscription_id))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> ApiResult {
    let deleted = state
        .gateway
        .cancel_subscription(&request.subscription_id)
        .await
        .map_err(upstream_failure("Cancel subscription"))?;

    info!("Cancelled subscription {}", request.subscription_id);
    Ok(Json(deleted))
}

/// Move the subscription's first item onto the new plan's price
#[instrument(skip(state, request), fields(subscription = %request.subscription_id))]
pub async fn update_subscription(
    State(state): State<AppState>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> ApiResult {
    let price = state
        .config
        .prices
        .resolve(&request.new_price_id)
        .map_err(billing_error_to_response)?;

    let subscription = state
        .gateway
        .retrieve_subscription(&request.subscription_id)
        .await
        .map_err(upstream_failure("Retrieve subscription"))?;
    let item = first_subscription_item(&subscription).map_err(billing_error_to_response)?;

    let updated = state
        .gateway
        .update_subscription(
            &request.subscription_id,
            &SubscriptionUpdate::change_price(item, price),
        )
        .await
        .map_err(upstream_failure("Update subscription"))?;

    Ok(Json(updated))
}

/// Create the demo product and its metered graduated price
#[instrument(skip(state))]
pub async fn create_product_and_prices(State(state): State<AppState>) -> Response {
    let catalog = &state.fixtures.catalog;

    let product = match state.gateway.create_product(&catalog.product).await {
        Ok(product) => product,
        Err(err) => return upstream_failure("Create product")(err),
    };
    let product_id = match resource_id(&product) {
        Ok(id) => id,
        Err(err) => return billing_error_to_response(err),
    };

    match state
        .gateway
        .create_tiered_price(&catalog.price.for_product(product_id))
        .await
    {
        Ok(price) => {
            info!("Created price {:?} on product {}", price.get("id"), product_id);
            Json(json!({ "price": price })).into_response()
        }
        Err(err) => {
            error!("Price creation failed: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

/// Platform subscription from the demo customer to the connected account
#[instrument(skip(state))]
pub async fn create_connect_subscription(State(state): State<AppState>) -> Response {
    let fixture = &state.fixtures.connect_subscription;

    let mut params = SubscriptionParams::new(&state.config.demo_customer, &fixture.price);
    params.description = Some(fixture.description.clone());
    params.metadata = fixture.metadata.clone();
    params.payment_behavior = Some(PaymentBehavior::ErrorIfIncomplete);
    params.cancel_at_period_end = Some(true);
    params.cancel_at = Some(fixture.cancel_at);
    params.application_fee_percent = Some(fixture.application_fee_percent);
    params.collection_method = Some(CollectionMethod::ChargeAutomatically);
    params.proration_behavior = Some(ProrationBehavior::CreateProrations);
    params.transfer_destination = Some(state.config.connect_account.clone());

    match state.gateway.create_subscription(&params).await {
        Ok(subscription) => {
            info!("Created connect subscription {:?}", subscription.get("id"));
            Json(json!({ "subscription": subscription })).into_response()
        }
        Err(err) => {
            error!("Connect subscription failed: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

/// Report minutes used against the demo metered item
#[instrument(skip(state, request), fields(minutes = request.minutes))]
pub async fn use_product(
    State(state): State<AppState>,
    Json(request): Json<UseProductRequest>,
) -> Response {
    let record = UsageRecordParams::set_now(request.minutes);
    let key = IdempotencyKey::generate();

    match state
        .gateway
        .create_usage_record(&state.fixtures.usage_subscription_item, &record, &key)
        .await
    {
        Ok(usage) => {
            info!("Recorded {} minutes (key {})", request.minutes, key);
            Json(json!({ "usageRecord": usage })).into_response()
        }
        Err(err) => {
            error!("Usage record failed: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

#[instrument(skip(state, request))]
pub async fn retrieve_customer_payment_method(
    State(state): State<AppState>,
    Json(request): Json<RetrievePaymentMethodRequest>,
) -> ApiResult {
    let payment_method = state
        .gateway
        .retrieve_payment_method(&request.payment_method_id)
        .await
        .map_err(upstream_failure("Retrieve payment method"))?;

    Ok(Json(payment_method))
}

/// Accepted but not acted on; the client gets an explicit 501
#[instrument(skip(request))]
pub async fn report_usage(Json(request): Json<ReportUsageRequest>) -> Response {
    info!("report-usage called with {}", request.number);
    billing_error_to_response(BillingError::NotImplemented(
        "report-usage does not record usage; use /use-product".to_string(),
    ))
}

/// Bill the demo customer one fixed price with a coupon, then pay it
#[instrument(skip(state))]
pub async fn create_invoice_dmr(State(state): State<AppState>) -> Response {
    let customer = &state.config.demo_customer;
    let fixtures = &state.fixtures;

    let result = async {
        state
            .gateway
            .create_invoice_item(&InvoiceItemParams {
                customer: customer.clone(),
                price: fixtures.invoice_price.clone(),
            })
            .await?;

        let invoice = state
            .gateway
            .create_invoice(&InvoiceParams {
                customer: customer.clone(),
                auto_advance: Some(true),
                collection_method: Some(CollectionMethod::ChargeAutomatically),
                coupons: vec![fixtures.invoice_coupon.clone()],
            })
            .await?;

        state.gateway.pay_invoice(resource_id(&invoice)?).await?;
        Ok::<_, BillingError>(invoice)
    }
    .await;

    match result {
        Ok(invoice) => {
            info!("Created and paid invoice {:?}", invoice.get("id"));
            Json(json!({ "invoice": invoice })).into_response()
        }
        Err(err) => {
            error!("Invoice flow failed: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

/// Stripe webhook handler
///
/// Verification failures are 400 and nothing is dispatched. Once verified
/// the delivery is acknowledged with 200 whatever the handler returns.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, Response> {
    let reject = |message: &str| {
        warn!("Webhook rejected: {}", message);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(message, 400)),
        )
            .into_response()
    };

    let Some(verifier) = state.verifier.as_ref() else {
        return Err(reject("Webhook secret not configured"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| reject("Missing Stripe-Signature header"))?;

    verifier
        .verify(&body, signature)
        .map_err(|e| reject(&e.to_string()))?;

    let event = parse_event(&body).map_err(|e| reject(&e.to_string()))?;

    info!(
        "Received webhook: type={}, id={}",
        event.kind.type_name(),
        event.event_id
    );

    if let Err(e) = dispatch_event(state.webhook_handler.as_ref(), &event) {
        error!("Webhook handler error: {}", e);
    }

    Ok(StatusCode::OK)
}
