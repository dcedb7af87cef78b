//! # Storefront
//!
//! Checkout, payments and order tracking API.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export ADMIN_USERNAME=admin
//! export ADMIN_PASSWORD=...
//! export PAYPAL_CLIENT_ID=...
//! export PAYPAL_CLIENT_SECRET=...
//! export PAYPAL_MODE=sandbox
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, state::AppState};
use std::net::SocketAddr;
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

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment providers: {:?}", state.providers.kinds());

    let paypal = state.paypal_config().await?;
    info!("PayPal: enabled={}, mode={}", paypal.enabled, paypal.mode.as_str());
    if state.config.admin.is_none() {
        warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, admin login is disabled");
    }

    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Orders: POST http://{}/api/orders", addr);
        info!("Tracking: GET http://{}/api/track/{{order_number}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Storefront RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Checkout & payments API
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
