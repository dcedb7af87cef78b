//! # Settings Store
//!
//! Generic string key-value configuration shared by the storefront and the
//! admin back office. Values carry no schema; consumers parse what they need
//! at request time. Each key is upserted independently, so a multi-key update
//! is last-writer-wins per key with no transaction around the batch.

use crate::error::{ShopError, ShopResult, ValidationErrors};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Flat settings snapshot
pub type SettingsMap = BTreeMap<String, String>;

/// Setting keys consumed by the checkout core
pub mod keys {
    pub const TAX_RATE: &str = "taxRate";
    pub const FREE_SHIPPING_THRESHOLD: &str = "freeShippingThreshold";
    pub const SHIPPING_FLAT_RATE: &str = "shippingFlatRate";
    pub const ORDER_PREFIX: &str = "orderPrefix";
    pub const CURRENCY: &str = "currency";

    pub const STRIPE_ENABLED: &str = "stripeEnabled";
    pub const STRIPE_PUBLIC_KEY: &str = "stripePublicKey";
    pub const STRIPE_SECRET_KEY: &str = "stripeSecretKey";

    pub const PAYPAL_ENABLED: &str = "paypalEnabled";
    pub const PAYPAL_CLIENT_ID: &str = "paypalClientId";
    pub const PAYPAL_CLIENT_SECRET: &str = "paypalClientSecret";
    pub const PAYPAL_MODE: &str = "paypalMode";

    pub const COD_ENABLED: &str = "codEnabled";
}

/// Keys that hold credentials. They can be written through the settings
/// surface but are never returned by generic reads.
pub const SECRET_KEYS: &[&str] = &[keys::PAYPAL_CLIENT_SECRET, keys::STRIPE_SECRET_KEY];

pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}

/// Copy of `settings` with every secret key removed
pub fn public_view(settings: &SettingsMap) -> SettingsMap {
    settings
        .iter()
        .filter(|(key, _)| !is_secret_key(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Boolean toggle: only the literal string `"true"` turns a flag on
pub fn flag(settings: &SettingsMap, key: &str) -> bool {
    settings.get(key).map(|v| v == "true").unwrap_or(false)
}

/// Non-empty, trimmed value for `key`
pub fn non_empty<'a>(settings: &'a SettingsMap, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Turn a JSON settings patch into a flat string map.
///
/// Strings pass through; numbers and booleans are stringified; nested values
/// are rejected per key.
pub fn normalize_updates(
    updates: BTreeMap<String, serde_json::Value>,
) -> ShopResult<SettingsMap> {
    let mut errors = ValidationErrors::new();
    let mut normalized = SettingsMap::new();

    for (key, value) in updates {
        if key.trim().is_empty() {
            errors.form("Setting keys must not be empty");
            continue;
        }
        match value {
            serde_json::Value::String(s) => {
                normalized.insert(key, s);
            }
            serde_json::Value::Number(n) => {
                normalized.insert(key, n.to_string());
            }
            serde_json::Value::Bool(b) => {
                normalized.insert(key, b.to_string());
            }
            serde_json::Value::Null => {
                normalized.insert(key, String::new());
            }
            _ => errors.field(key, "Expected a string value"),
        }
    }

    errors.into_result()?;
    Ok(normalized)
}

/// Persistence for site settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Every stored setting, secrets included
    async fn all(&self) -> ShopResult<SettingsMap>;

    /// One setting by key
    async fn get(&self, key: &str) -> ShopResult<Option<String>>;

    /// Insert or overwrite one key
    async fn upsert(&self, key: &str, value: &str) -> ShopResult<()>;

    /// Upsert several keys, each independently
    async fn upsert_many(&self, entries: &SettingsMap) -> ShopResult<()> {
        for (key, value) in entries {
            self.upsert(key, value).await?;
        }
        Ok(())
    }
}

/// Type alias for a shared settings store (dynamic dispatch)
pub type BoxedSettingsStore = Arc<dyn SettingsStore>;

/// Process-local settings store
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `entries`
    pub fn with_entries(entries: SettingsMap) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Create a store from a TOML seed document:
    ///
    /// ```toml
    /// [settings]
    /// taxRate = "0.08"
    /// codEnabled = true
    /// ```
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let seed: SettingsSeed = toml::from_str(toml_str)
            .map_err(|e| ShopError::Configuration(format!("Invalid settings seed: {}", e)))?;
        Ok(Self::with_entries(seed.into_map()))
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn all(&self) -> ShopResult<SettingsMap> {
        let entries = self.entries.read().await;
        Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn get(&self, key: &str) -> ShopResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &str) -> ShopResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSeed {
    #[serde(default)]
    settings: BTreeMap<String, toml::Value>,
}

impl SettingsSeed {
    fn into_map(self) -> SettingsMap {
        self.settings
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}
