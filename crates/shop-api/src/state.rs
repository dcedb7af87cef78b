//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the order service, settings store, payment providers and admin
//! session bookkeeping.

use crate::auth::{AdminCredentials, AdminSessions};
use shop_core::{
    BoxedLoginAttemptTracker, BoxedSettingsStore, CashOnDeliveryProvider, InMemoryLoginAttempts,
    InMemoryOrderRepository, InMemorySettingsStore, OrderService, PaymentProviders,
    StripeProvider,
};
use shop_paypal::{PayPalConfig, PayPalEnv, PayPalGateway, PayPalProvider, DEFAULT_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Order number prefix when the `orderPrefix` setting is unset
    pub order_prefix: Option<String>,
    /// Admin account; `None` disables admin login
    pub admin: Option<AdminCredentials>,
    /// Per-call timeout for PayPal requests
    pub paypal_timeout: Duration,
    /// Key login throttling on `X-Forwarded-For`; only set behind a proxy
    /// that overwrites the header
    pub trust_forwarded_for: bool,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let admin = match (var("ADMIN_USERNAME"), var("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials::new(username, password)),
            _ => None,
        };

        Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            order_prefix: var("ORDER_PREFIX"),
            admin,
            paypal_timeout: var("PAYPAL_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            trust_forwarded_for: var("TRUST_PROXY")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            order_prefix: None,
            admin: None,
            paypal_timeout: DEFAULT_TIMEOUT,
            trust_forwarded_for: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Order creation, updates and tracking
    pub orders: OrderService,
    /// Runtime key-value settings
    pub settings: BoxedSettingsStore,
    /// Payment providers by kind
    pub providers: PaymentProviders,
    /// PayPal overrides captured at startup
    pub paypal_env: PayPalEnv,
    /// Admin bearer sessions
    pub sessions: AdminSessions,
    /// Failed admin login bookkeeping
    pub login_attempts: BoxedLoginAttemptTracker,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the process environment and `config/settings.toml`
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let settings = load_settings_seed()?;
        let gateway = PayPalGateway::new(config.paypal_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to initialize PayPal gateway: {}", e))?;

        Ok(Self::from_parts(
            config,
            Arc::new(settings),
            PayPalEnv::from_env(),
            gateway,
        ))
    }

    /// Assemble state from explicit components
    pub fn from_parts(
        config: AppConfig,
        settings: BoxedSettingsStore,
        paypal_env: PayPalEnv,
        gateway: PayPalGateway,
    ) -> Self {
        let mut orders = OrderService::new(Arc::new(InMemoryOrderRepository::new()), settings.clone());
        if let Some(prefix) = &config.order_prefix {
            orders = orders.with_fallback_prefix(prefix.clone());
        }

        let providers = PaymentProviders::new()
            .with_provider(Arc::new(StripeProvider))
            .with_provider(Arc::new(PayPalProvider::new(gateway, paypal_env.clone())))
            .with_provider(Arc::new(CashOnDeliveryProvider));

        Self {
            orders,
            settings,
            providers,
            paypal_env,
            sessions: AdminSessions::default(),
            login_attempts: Arc::new(InMemoryLoginAttempts::default()),
            config,
        }
    }

    /// Effective PayPal configuration from the current settings
    pub async fn paypal_config(&self) -> shop_core::ShopResult<PayPalConfig> {
        let settings = self.settings.all().await?;
        Ok(PayPalConfig::resolve(&self.paypal_env, &settings))
    }
}

/// Seed the settings store from config/settings.toml
fn load_settings_seed() -> anyhow::Result<InMemorySettingsStore> {
    let config_paths = [
        "config/settings.toml",
        "../config/settings.toml",
        "../../config/settings.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let store = InMemorySettingsStore::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded settings seed from {}", path);
            return Ok(store);
        }
    }

    tracing::warn!("No settings seed found, starting with empty settings");
    Ok(InMemorySettingsStore::new())
}
