//! # Routes
//!
//! Axum router configuration for the billing API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, get_service, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  / - client bundle `index.html`
/// - GET  /config - publishable key
/// - GET  /health - liveness
/// - POST /create-customer, /create-subscription, /retry-invoice,
///   /retrieve-upcoming-invoice, /cancel-subscription, /update-subscription
/// - POST /create-product-and-prices, /create-subscription-between-J-and-J,
///   /use-product, /create-invoice-dmr (demo flows on fixed fixtures)
/// - POST /retrieve-customer-payment-method, /report-usage
/// - POST /webhook - Stripe webhook (raw body)
/// - anything else - static files from `STATIC_DIR`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.config.static_dir.clone();
    let index = ServeFile::new(static_dir.join("index.html"));

    let billing_routes = Router::new()
        .route("/create-customer", post(handlers::create_customer))
        .route("/create-subscription", post(handlers::create_subscription))
        .route("/retry-invoice", post(handlers::retry_invoice))
        .route(
            "/retrieve-upcoming-invoice",
            post(handlers::retrieve_upcoming_invoice),
        )
        .route("/cancel-subscription", post(handlers::cancel_subscription))
        .route("/update-subscription", post(handlers::update_subscription))
        .route(
            "/retrieve-customer-payment-method",
            post(handlers::retrieve_customer_payment_method),
        )
        .route("/report-usage", post(handlers::report_usage));

    let demo_routes = Router::new()
        .route(
            "/create-product-and-prices",
            post(handlers::create_product_and_prices),
        )
        .route(
            "/create-subscription-between-J-and-J",
            post(handlers::create_connect_subscription),
        )
        .route("/use-product", post(handlers::use_product))
        .route("/create-invoice-dmr", post(handlers::create_invoice_dmr));

    Router::new()
        .route("/", get_service(index))
        .route("/config", get(handlers::get_config))
        .route("/health", get(handlers::health))
        .merge(billing_routes)
        .merge(demo_routes)
        // Webhook takes the raw body for signature verification
        .route("/webhook", post(handlers::stripe_webhook))
        .fallback_service(ServeDir::new(static_dir))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
