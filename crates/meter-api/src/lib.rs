//! # meter-api
//!
//! HTTP API layer for the usage-billing backend.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - JSON endpoints for customers, subscriptions, invoices and metered usage
//! - Stripe webhook verification and dispatch
//! - Static serving of the client bundle
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Client `index.html` |
//! | GET | `/config` | Publishable key |
//! | GET | `/health` | Health check |
//! | POST | `/create-customer` | Create customer |
//! | POST | `/create-subscription` | Attach card and subscribe to a plan |
//! | POST | `/retry-invoice` | Swap card and fetch invoice |
//! | POST | `/retrieve-upcoming-invoice` | Prorated plan-change preview |
//! | POST | `/cancel-subscription` | Cancel subscription |
//! | POST | `/update-subscription` | Change plan |
//! | POST | `/create-product-and-prices` | Demo metered product |
//! | POST | `/create-subscription-between-J-and-J` | Demo Connect subscription |
//! | POST | `/use-product` | Report metered minutes |
//! | POST | `/retrieve-customer-payment-method` | Fetch payment method |
//! | POST | `/report-usage` | Not implemented (501) |
//! | POST | `/create-invoice-dmr` | Demo invoice with coupon |
//! | POST | `/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, ConfigError};
