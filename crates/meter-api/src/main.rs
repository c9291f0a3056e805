//! # usage-billing
//!
//! Usage-based subscription billing backend.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or put them in .env)
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export BASIC=price_...
//! export PREMIUM=price_...
//! export STATIC_DIR=../../client
//! export COMPTE_CONNECT_CLIENT_ID=acct_...
//! export COMPTE_CUSTOMER_CLIENT_ID=cus_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # Run the server
//! usage-billing
//! ```

use meter_api::{routes, state::AppConfig, state::AppState};
use meter_stripe::SUBSCRIBED_WEBHOOK_EVENTS;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            for line in err.report() {
                println!("{}", line);
            }
            std::process::exit(1);
        }
    };

    let addr = config.socket_addr()?;

    if config.is_live_mode() {
        warn!("Using live Stripe keys");
    }
    if config.webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET not set; webhook deliveries will be rejected");
    } else {
        info!(
            "Webhook endpoint /webhook expects events: {}",
            SUBSCRIBED_WEBHOOK_EVENTS.join(", ")
        );
    }
    info!("Serving client from {}", config.static_dir.display());

    let state = AppState::new(config)?;
    info!("Billing provider: {}", state.gateway.provider_name());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("usage-billing listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
