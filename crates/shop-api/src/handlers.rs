//! # Request Handlers
//!
//! Axum request handlers for the storefront API.

use crate::auth::{bearer_token, ClientKey, RequireAdmin};
use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shop_core::settings::{self, keys, SettingsMap};
use shop_core::{
    validate_cart_lines, CartLine, IntentRequest, Order, OrderDraft, OrderPatch, PaymentCapture,
    PaymentIntent, PaymentProviderKind, PriceQuote, PricingEngine, PricingPolicy,
    ProviderAvailability, ShopError, TrackingView, DEFAULT_CURRENCY,
};
use shop_paypal::PublicPayPalConfig;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Amount for a new payment; accepts `"10.00"` or `10`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AmountRequest {
    pub amount: Option<Value>,
    pub currency: Option<String>,
}

impl AmountRequest {
    fn into_intent_request(self) -> Result<IntentRequest, ShopError> {
        let amount = match self.amount {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ShopError::InvalidAmount),
        };
        Ok(IntentRequest::new(amount, self.currency))
    }
}

/// Capture a provider payment, optionally marking a storefront order paid
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    #[serde(alias = "orderId", alias = "orderID")]
    pub reference: String,
    pub order_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOptions {
    pub providers: Vec<PaymentProviderKind>,
    pub pricing: PricingPolicy,
    pub currency: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStatus {
    pub paypal_client_secret: bool,
    pub stripe_secret_key: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// --- Orders ------------------------------------------------------------------

#[instrument(skip(state, draft))]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<OrderDraft>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    if let Some(requested) = draft.status.as_deref().filter(|s| *s != "pending") {
        warn!("Ignoring client-supplied order status {:?}", requested);
    }
    let order = state.orders.create_order(&draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[instrument(skip(state, patch))]
pub async fn update_order(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<OrderPatch>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.update_order(id, patch).await?))
}

pub async fn list_orders(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_orders().await?))
}

pub async fn clear_orders(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let cleared = state.orders.clear_orders().await?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

pub async fn track_order(
    State(state): State<AppState>,
    ApiPath(order_number): ApiPath<String>,
) -> ApiResult<Json<TrackingView>> {
    Ok(Json(state.orders.get_by_order_number(&order_number).await?))
}

// --- PayPal ------------------------------------------------------------------

pub async fn paypal_config(State(state): State<AppState>) -> ApiResult<Json<PublicPayPalConfig>> {
    Ok(Json(state.paypal_config().await?.public()))
}

/// Create a PayPal order; responds with PayPal's order body
#[instrument(skip(state, request))]
pub async fn paypal_create_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> ApiResult<Json<Value>> {
    let intent = open_intent(&state, PaymentProviderKind::PayPal, request).await?;
    Ok(Json(intent.payload.unwrap_or(Value::Null)))
}

/// Capture an approved PayPal order; responds with PayPal's capture body
#[instrument(skip(state, request))]
pub async fn paypal_capture_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CaptureRequest>,
) -> ApiResult<Json<Value>> {
    let capture = capture_payment_for(&state, PaymentProviderKind::PayPal, request).await?;
    Ok(Json(capture.payload.unwrap_or(Value::Null)))
}

// --- Generic provider dispatch ----------------------------------------------

#[instrument(skip(state, request))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> ApiResult<Json<PaymentIntent>> {
    let kind: PaymentProviderKind = provider.parse()?;
    Ok(Json(open_intent(&state, kind, request).await?))
}

#[instrument(skip(state, request))]
pub async fn capture_payment(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiJson(request): ApiJson<CaptureRequest>,
) -> ApiResult<Json<PaymentCapture>> {
    let kind: PaymentProviderKind = provider.parse()?;
    Ok(Json(capture_payment_for(&state, kind, request).await?))
}

async fn open_intent(
    state: &AppState,
    kind: PaymentProviderKind,
    request: AmountRequest,
) -> Result<PaymentIntent, ShopError> {
    let request = request.into_intent_request()?;
    let settings = state.settings.all().await?;
    let availability = resolve_availability(state, &settings);
    let provider = state.providers.get(kind)?;

    let intent = provider
        .create_intent(&request, &settings, &availability)
        .await?;
    info!(
        "Opened {} payment for {} {}",
        kind, intent.amount, intent.currency
    );
    Ok(intent)
}

async fn capture_payment_for(
    state: &AppState,
    kind: PaymentProviderKind,
    request: CaptureRequest,
) -> Result<PaymentCapture, ShopError> {
    let settings = state.settings.all().await?;
    let availability = resolve_availability(state, &settings);
    let provider = state.providers.get(kind)?;

    let capture = provider
        .capture(&request.reference, &settings, &availability)
        .await?;

    if let Some(order_number) = request.order_number.as_deref().filter(|n| !n.trim().is_empty()) {
        if capture.is_completed() {
            state.orders.mark_paid(order_number, &capture).await?;
        }
    }
    Ok(capture)
}

/// Provider toggles with PayPal's flag resolved against env credentials
fn resolve_availability(state: &AppState, settings: &SettingsMap) -> ProviderAvailability {
    let paypal = shop_paypal::PayPalConfig::resolve(&state.paypal_env, settings);
    ProviderAvailability::from_settings(settings, paypal.enabled)
}

// --- Settings ----------------------------------------------------------------

/// Public settings; secret keys are never included
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsMap>> {
    let all = state.settings.all().await?;
    Ok(Json(settings::public_view(&all)))
}

#[instrument(skip(state, updates), fields(keys = updates.len()))]
pub async fn update_settings(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(updates): ApiJson<BTreeMap<String, Value>>,
) -> ApiResult<Json<SettingsMap>> {
    let updates = settings::normalize_updates(updates)?;
    state.settings.upsert_many(&updates).await?;

    let changed: Vec<&str> = updates.keys().map(String::as_str).collect();
    info!("Updated settings: {:?}", changed);

    let all = state.settings.all().await?;
    Ok(Json(settings::public_view(&all)))
}

// --- Checkout ----------------------------------------------------------------

/// Providers to offer and the pricing policy in force
pub async fn checkout_options(State(state): State<AppState>) -> ApiResult<Json<CheckoutOptions>> {
    let all = state.settings.all().await?;
    let availability = resolve_availability(&state, &all);

    Ok(Json(CheckoutOptions {
        providers: availability.offered(),
        pricing: PricingPolicy::from_settings(&all),
        currency: settings::non_empty(&all, keys::CURRENCY)
            .unwrap_or(DEFAULT_CURRENCY)
            .to_uppercase(),
    }))
}

/// Price a cart with the current store policy
pub async fn checkout_quote(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> ApiResult<Json<PriceQuote>> {
    validate_cart_lines(&request.items)?;

    let all = state.settings.all().await?;
    let engine = PricingEngine::new(PricingPolicy::from_settings(&all));
    Ok(Json(engine.quote(request.items)?))
}

// --- Admin -------------------------------------------------------------------

#[instrument(skip(state, client, request), fields(client = %client.0))]
pub async fn admin_login(
    State(state): State<AppState>,
    client: ClientKey,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    state.login_attempts.check(&client.0).await?;

    let accepted = state
        .config
        .admin
        .as_ref()
        .map(|admin| admin.verify(&request.username, &request.password))
        .unwrap_or(false);

    if !accepted {
        state.login_attempts.record_failure(&client.0).await;
        warn!("Failed admin login for {:?}", request.username);
        return Err(ShopError::Unauthorized.into());
    }

    state.login_attempts.reset(&client.0).await;
    let token = state.sessions.issue().await;
    info!("Admin logged in");

    Ok(Json(SessionResponse {
        is_admin: true,
        token: Some(token),
    }))
}

pub async fn admin_session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    let is_admin = match bearer_token(&headers) {
        Some(token) => state.sessions.is_valid(token).await,
        None => false,
    };
    Json(SessionResponse {
        is_admin,
        token: None,
    })
}

pub async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Json(SessionResponse {
        is_admin: false,
        token: None,
    })
}

/// Which secrets are set, never their values
pub async fn admin_secrets(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<SecretStatus>> {
    let all = state.settings.all().await?;
    let paypal = shop_paypal::PayPalConfig::resolve(&state.paypal_env, &all);

    Ok(Json(SecretStatus {
        paypal_client_secret: paypal.has_secret(),
        stripe_secret_key: settings::non_empty(&all, keys::STRIPE_SECRET_KEY).is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_request_accepts_strings_and_numbers() {
        let request: AmountRequest = serde_json::from_value(json!({ "amount": "10.00" })).unwrap();
        assert_eq!(request.into_intent_request().unwrap().amount, "10.00");

        let request: AmountRequest = serde_json::from_value(json!({ "amount": 12.5 })).unwrap();
        assert_eq!(request.into_intent_request().unwrap().amount, "12.5");

        let request: AmountRequest = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            request.into_intent_request(),
            Err(ShopError::InvalidAmount)
        ));
    }

    #[test]
    fn test_capture_request_aliases() {
        let request: CaptureRequest =
            serde_json::from_value(json!({ "orderID": "PP-1", "orderNumber": "NVZ-1" })).unwrap();
        assert_eq!(request.reference, "PP-1");
        assert_eq!(request.order_number.as_deref(), Some("NVZ-1"));

        let request: CaptureRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.reference.is_empty());
    }
}
