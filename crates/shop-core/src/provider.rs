//! # Payment Provider Trait
//!
//! Uniform contract over the payment methods a storefront can offer.
//! Implementations: PayPal (remote gateway), Stripe and Cash on Delivery.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentProvider (trait)                  │
//! │  ├── create_intent()                                        │
//! │  ├── capture()                                              │
//! │  └── kind()                                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┼─────────────────┐
//!          │                 │                 │
//!  ┌───────┴───────┐ ┌───────┴───────┐ ┌───────┴───────┐
//!  │ PayPalProvider│ │StripeProvider │ │ CashOnDelivery│
//!  │ (shop-paypal) │ │  (deferred)   │ │   Provider    │
//!  └───────────────┘ └───────────────┘ └───────────────┘
//! ```
//!
//! Settings are passed on every call because provider enablement and
//! credentials are resolved per request, never cached.

use crate::error::{ShopError, ShopResult};
use crate::pricing::{parse_amount, round_money};
use crate::settings::{flag, keys, SettingsMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Payment method tag stored on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentProviderKind {
    #[serde(rename = "stripe")]
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
    #[serde(rename = "cod")]
    CashOnDelivery,
}

impl PaymentProviderKind {
    pub const ALL: [PaymentProviderKind; 3] = [
        PaymentProviderKind::Stripe,
        PaymentProviderKind::PayPal,
        PaymentProviderKind::CashOnDelivery,
    ];

    /// Wire tag (`stripe`, `paypal`, `cod`)
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => "stripe",
            PaymentProviderKind::PayPal => "paypal",
            PaymentProviderKind::CashOnDelivery => "cod",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => "Stripe",
            PaymentProviderKind::PayPal => "PayPal",
            PaymentProviderKind::CashOnDelivery => "Cash on Delivery",
        }
    }

    /// Settings key of the enable toggle
    pub fn enabled_key(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => keys::STRIPE_ENABLED,
            PaymentProviderKind::PayPal => keys::PAYPAL_ENABLED,
            PaymentProviderKind::CashOnDelivery => keys::COD_ENABLED,
        }
    }

    pub fn disabled_error(&self) -> ShopError {
        ShopError::ProviderDisabled {
            provider: self.display_name().to_string(),
        }
    }
}

impl std::fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentProviderKind {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProviderKind::Stripe),
            "paypal" => Ok(PaymentProviderKind::PayPal),
            "cod" => Ok(PaymentProviderKind::CashOnDelivery),
            other => Err(ShopError::InvalidRequest(format!(
                "Unknown payment provider: {}",
                other
            ))),
        }
    }
}

/// Which providers the storefront checkout should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAvailability {
    pub stripe: bool,
    pub paypal: bool,
    pub cod: bool,
}

impl ProviderAvailability {
    /// Build from settings toggles. `paypal_enabled` is the resolved PayPal
    /// flag, which environment credentials can also switch on.
    pub fn from_settings(settings: &SettingsMap, paypal_enabled: bool) -> Self {
        Self {
            stripe: flag(settings, keys::STRIPE_ENABLED),
            paypal: paypal_enabled,
            cod: flag(settings, keys::COD_ENABLED),
        }
    }

    /// Nothing has been switched on yet
    pub fn none_configured(&self) -> bool {
        !self.stripe && !self.paypal && !self.cod
    }

    /// Whether checkout should show `kind`. With nothing configured the
    /// storefront offers Stripe and PayPal.
    pub fn offers(&self, kind: PaymentProviderKind) -> bool {
        let fallback = self.none_configured();
        match kind {
            PaymentProviderKind::Stripe => self.stripe || fallback,
            PaymentProviderKind::PayPal => self.paypal || fallback,
            PaymentProviderKind::CashOnDelivery => self.cod,
        }
    }

    /// Providers to show, in display order
    pub fn offered(&self) -> Vec<PaymentProviderKind> {
        PaymentProviderKind::ALL
            .into_iter()
            .filter(|kind| self.offers(*kind))
            .collect()
    }
}

/// ISO 4217 code used when neither the request nor the store sets one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Request to open a payment with a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Raw amount as submitted; providers validate it
    pub amount: String,
    /// ISO 4217 code, defaults to `USD`
    #[serde(default)]
    pub currency: Option<String>,
}

impl IntentRequest {
    pub fn new(amount: impl Into<String>, currency: Option<String>) -> Self {
        Self {
            amount: amount.into(),
            currency,
        }
    }

    /// Uppercased currency code, `USD` when absent or blank
    pub fn currency_code(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }
}

/// State of an opened payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Customer must approve with the provider before capture
    AwaitingApproval,
    /// Nothing to approve; settled outside the storefront
    Deferred,
}

/// An opened payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub provider: PaymentProviderKind,
    /// Provider-side id (PayPal order id), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: IntentStatus,
    /// Raw provider response, relayed to the client untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Completed,
    Pending,
    DueOnDelivery,
}

/// A captured (or scheduled) payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCapture {
    pub provider: PaymentProviderKind,
    pub reference: String,
    pub status: CaptureStatus,
    /// Amount the provider reports as captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl PaymentCapture {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, CaptureStatus::Completed)
    }
}

/// Core trait for payment method implementations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Which payment method this is
    fn kind(&self) -> PaymentProviderKind;

    /// Open a payment for `request.amount`.
    ///
    /// Fails with `InvalidAmount` before any remote call when the amount is
    /// not a finite positive decimal, and with `ProviderDisabled` when the
    /// method is switched off.
    ///
    /// `availability` is the set checkout currently offers, with PayPal
    /// already resolved against environment credentials.
    async fn create_intent(
        &self,
        request: &IntentRequest,
        settings: &SettingsMap,
        availability: &ProviderAvailability,
    ) -> ShopResult<PaymentIntent>;

    /// Capture a previously opened payment by provider reference.
    async fn capture(
        &self,
        reference: &str,
        settings: &SettingsMap,
        availability: &ProviderAvailability,
    ) -> ShopResult<PaymentCapture>;
}

/// Type alias for a shared payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;

/// Registry of the providers this deployment can dispatch to
#[derive(Clone, Default)]
pub struct PaymentProviders {
    providers: HashMap<PaymentProviderKind, BoxedPaymentProvider>,
}

impl PaymentProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one of the same kind
    pub fn register(&mut self, provider: BoxedPaymentProvider) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Register with builder pattern
    pub fn with_provider(mut self, provider: BoxedPaymentProvider) -> Self {
        self.register(provider);
        self
    }

    /// Provider for `kind`, `NotConfigured` when none is registered
    pub fn get(&self, kind: PaymentProviderKind) -> ShopResult<&BoxedPaymentProvider> {
        self.providers
            .get(&kind)
            .ok_or_else(|| ShopError::NotConfigured(kind.display_name().to_string()))
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<PaymentProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn has_provider(&self, kind: PaymentProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }
}

fn deferred_intent(kind: PaymentProviderKind, request: &IntentRequest) -> ShopResult<PaymentIntent> {
    let amount = parse_amount(&request.amount)?;
    Ok(PaymentIntent {
        provider: kind,
        reference: None,
        amount: round_money(amount),
        currency: request.currency_code(),
        status: IntentStatus::Deferred,
        payload: None,
        created_at: Utc::now(),
    })
}

/// Cash on delivery: nothing is charged online; the courier collects.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashOnDeliveryProvider;

#[async_trait]
impl PaymentProvider for CashOnDeliveryProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::CashOnDelivery
    }

    async fn create_intent(
        &self,
        request: &IntentRequest,
        _settings: &SettingsMap,
        availability: &ProviderAvailability,
    ) -> ShopResult<PaymentIntent> {
        let intent = deferred_intent(self.kind(), request)?;
        if !availability.offers(self.kind()) {
            return Err(self.kind().disabled_error());
        }
        Ok(intent)
    }

    async fn capture(
        &self,
        reference: &str,
        _settings: &SettingsMap,
        availability: &ProviderAvailability,
    ) -> ShopResult<PaymentCapture> {
        if reference.trim().is_empty() {
            return Err(ShopError::InvalidRequest("Missing order reference".to_string()));
        }
        if !availability.offers(self.kind()) {
            return Err(self.kind().disabled_error());
        }
        Ok(PaymentCapture {
            provider: self.kind(),
            reference: reference.to_string(),
            status: CaptureStatus::DueOnDelivery,
            amount: None,
            currency: None,
            payload: None,
        })
    }
}

/// Stripe: the storefront only carries the toggle and keys. Orders are placed
/// against a deferred intent and settled outside this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripeProvider;

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_intent(
        &self,
        request: &IntentRequest,
        _settings: &SettingsMap,
        availability: &ProviderAvailability,
    ) -> ShopResult<PaymentIntent> {
        let intent = deferred_intent(self.kind(), request)?;
        if !availability.offers(self.kind()) {
            return Err(self.kind().disabled_error());
        }
        Ok(intent)
    }

    async fn capture(
        &self,
        reference: &str,
        _settings: &SettingsMap,
        _availability: &ProviderAvailability,
    ) -> ShopResult<PaymentCapture> {
        if reference.trim().is_empty() {
            return Err(ShopError::InvalidRequest("Missing order reference".to_string()));
        }
        Err(ShopError::NotConfigured("Stripe capture".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn offered(settings: &SettingsMap) -> ProviderAvailability {
        ProviderAvailability::from_settings(settings, flag(settings, keys::PAYPAL_ENABLED))
    }

    #[test]
    fn test_kind_wire_tags() {
        assert_eq!(
            serde_json::to_value(PaymentProviderKind::CashOnDelivery).unwrap(),
            "cod"
        );
        assert_eq!(
            "paypal".parse::<PaymentProviderKind>().unwrap(),
            PaymentProviderKind::PayPal
        );
        assert!("bitcoin".parse::<PaymentProviderKind>().is_err());
    }

    #[test]
    fn test_nothing_configured_offers_stripe_and_paypal() {
        let availability = ProviderAvailability::from_settings(&SettingsMap::new(), false);
        assert_eq!(
            availability.offered(),
            vec![PaymentProviderKind::Stripe, PaymentProviderKind::PayPal]
        );
    }

    #[test]
    fn test_only_enabled_providers_offered() {
        let availability =
            ProviderAvailability::from_settings(&settings(&[(keys::COD_ENABLED, "true")]), false);
        assert_eq!(availability.offered(), vec![PaymentProviderKind::CashOnDelivery]);

        let availability =
            ProviderAvailability::from_settings(&settings(&[(keys::STRIPE_ENABLED, "true")]), true);
        assert_eq!(
            availability.offered(),
            vec![PaymentProviderKind::Stripe, PaymentProviderKind::PayPal]
        );
    }

    #[test]
    fn test_currency_code_defaults_and_uppercases() {
        assert_eq!(IntentRequest::new("1", None).currency_code(), "USD");
        assert_eq!(IntentRequest::new("1", Some("eur".into())).currency_code(), "EUR");
        assert_eq!(IntentRequest::new("1", Some("  ".into())).currency_code(), "USD");
    }

    #[tokio::test]
    async fn test_cod_intent_requires_enablement() {
        let provider = CashOnDeliveryProvider;
        let request = IntentRequest::new("42.5", None);

        let err = provider
            .create_intent(&request, &SettingsMap::new(), &offered(&SettingsMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProviderDisabled { .. }));

        let enabled = settings(&[(keys::COD_ENABLED, "true")]);
        let intent = provider
            .create_intent(&request, &enabled, &offered(&enabled))
            .await
            .unwrap();
        assert_eq!(intent.status, IntentStatus::Deferred);
        assert_eq!(intent.amount.to_string(), "42.50");
    }

    #[tokio::test]
    async fn test_invalid_amount_checked_first() {
        let err = CashOnDeliveryProvider
            .create_intent(
                &IntentRequest::new("-5", None),
                &SettingsMap::new(),
                &offered(&SettingsMap::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_cod_capture_is_due_on_delivery() {
        let enabled = settings(&[(keys::COD_ENABLED, "true")]);
        let capture = CashOnDeliveryProvider
            .capture("NVZ-ABC-1234", &enabled, &offered(&enabled))
            .await
            .unwrap();
        assert_eq!(capture.status, CaptureStatus::DueOnDelivery);
        assert!(!capture.is_completed());
    }

    #[tokio::test]
    async fn test_stripe_capture_not_configured() {
        let err = StripeProvider
            .capture("cs_123", &SettingsMap::new(), &offered(&SettingsMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_stripe_follows_resolved_availability() {
        let request = IntentRequest::new("20", None);
        let empty = SettingsMap::new();

        let intent = StripeProvider
            .create_intent(&request, &empty, &ProviderAvailability::from_settings(&empty, false))
            .await
            .unwrap();
        assert_eq!(intent.status, IntentStatus::Deferred);

        // PayPal switched on by environment credentials ends the fallback
        let paypal_only = ProviderAvailability::from_settings(&empty, true);
        assert_eq!(paypal_only.offered(), vec![PaymentProviderKind::PayPal]);
        let err = StripeProvider
            .create_intent(&request, &empty, &paypal_only)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProviderDisabled { .. }));
    }

    #[test]
    fn test_registry() {
        let providers = PaymentProviders::new()
            .with_provider(Arc::new(CashOnDeliveryProvider))
            .with_provider(Arc::new(StripeProvider));

        assert_eq!(
            providers.kinds(),
            vec![PaymentProviderKind::Stripe, PaymentProviderKind::CashOnDelivery]
        );
        assert!(providers.get(PaymentProviderKind::PayPal).is_err());
        assert!(providers.has_provider(PaymentProviderKind::Stripe));
    }
}
