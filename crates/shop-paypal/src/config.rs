//! # PayPal Configuration
//!
//! Effective PayPal configuration is resolved per request from two layers:
//! environment variables (captured once at startup) win over the persisted
//! `paypal*` settings.

use serde::{Deserialize, Serialize};
use shop_core::settings::{flag, keys, non_empty, SettingsMap};
use shop_core::{PaymentProviderKind, ShopError, ShopResult};
use std::env;

const LIVE_API_BASE: &str = "https://api-m.paypal.com";
const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";

/// PayPal API environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    /// `live` (any case) selects live; anything else, including nothing,
    /// is sandbox
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("live") => PayPalMode::Live,
            _ => PayPalMode::Sandbox,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "sandbox",
            PayPalMode::Live => "live",
        }
    }

    /// REST API root for this mode
    pub fn api_base(&self) -> &'static str {
        match self {
            PayPalMode::Live => LIVE_API_BASE,
            PayPalMode::Sandbox => SANDBOX_API_BASE,
        }
    }
}

/// PayPal overrides from the process environment
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PayPalEnv {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub mode: Option<String>,
}

impl PayPalEnv {
    /// Read `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET` and `PAYPAL_MODE`.
    /// Empty values count as unset.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self {
            client_id: env_value("PAYPAL_CLIENT_ID"),
            client_secret: env_value("PAYPAL_CLIENT_SECRET"),
            mode: env_value("PAYPAL_MODE"),
        }
    }

    /// Both credentials are supplied by the environment
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl std::fmt::Debug for PayPalEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalEnv")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .field("mode", &self.mode)
            .finish()
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Effective PayPal configuration for one request
#[derive(Clone, PartialEq, Eq)]
pub struct PayPalConfig {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub mode: PayPalMode,
}

impl PayPalConfig {
    /// Merge environment and settings; environment wins field by field.
    ///
    /// `enabled` is true when the environment supplies both credentials, or
    /// when the `paypalEnabled` setting is `"true"`.
    pub fn resolve(env: &PayPalEnv, settings: &SettingsMap) -> Self {
        let pick = |from_env: &Option<String>, key: &str| {
            from_env
                .clone()
                .or_else(|| non_empty(settings, key).map(str::to_string))
        };

        let client_id = pick(&env.client_id, keys::PAYPAL_CLIENT_ID);
        let client_secret = pick(&env.client_secret, keys::PAYPAL_CLIENT_SECRET);
        let mode = PayPalMode::from_raw(pick(&env.mode, keys::PAYPAL_MODE).as_deref());

        Self {
            enabled: env.has_credentials() || flag(settings, keys::PAYPAL_ENABLED),
            client_id,
            client_secret,
            mode,
        }
    }

    /// Browser-safe view; never includes the secret
    pub fn public(&self) -> PublicPayPalConfig {
        PublicPayPalConfig {
            enabled: self.enabled,
            client_id: self.client_id.clone(),
            mode: self.mode,
        }
    }

    pub fn has_secret(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Credentials for an API call, or why there are none
    pub fn ensure_usable(&self) -> ShopResult<(&str, &str)> {
        if !self.enabled {
            return Err(PaymentProviderKind::PayPal.disabled_error());
        }
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(ShopError::NotConfigured("PayPal".to_string())),
        }
    }
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("enabled", &self.enabled)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .field("mode", &self.mode)
            .finish()
    }
}

/// What `GET /api/paypal/config` returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPayPalConfig {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub mode: PayPalMode,
}
