//! # shop-paypal
//!
//! PayPal integration for storefront-rs.
//!
//! - **PayPalConfig** resolves the effective configuration per request:
//!   environment credentials win over the persisted `paypal*` settings.
//! - **PayPalGateway** talks to the REST API: OAuth2 client-credentials
//!   token, Orders v2 create and capture.
//! - **PayPalProvider** plugs the gateway into the `PaymentProvider` trait.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_paypal::{PayPalConfig, PayPalEnv, PayPalGateway};
//!
//! let env = PayPalEnv::from_env();
//! let gateway = PayPalGateway::new(DEFAULT_TIMEOUT)?;
//!
//! // Per request
//! let config = PayPalConfig::resolve(&env, &settings.all().await?);
//! let order = gateway.create_order(&config, "63.99", None).await?;
//!
//! // After the buyer approves
//! let capture = gateway.capture_order(&config, order["id"].as_str().unwrap_or_default()).await?;
//! ```

pub mod config;
pub mod gateway;
pub mod provider;

pub use config::{PayPalConfig, PayPalEnv, PayPalMode, PublicPayPalConfig};
pub use gateway::{PayPalGateway, DEFAULT_TIMEOUT};
pub use provider::PayPalProvider;
