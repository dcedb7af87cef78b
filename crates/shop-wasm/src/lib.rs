//! # shop-wasm
//!
//! WebAssembly bindings for storefront-rs.
//!
//! Runs the same pricing rules as the server in the browser so the cart can
//! show shipping, tax and total before checkout:
//! - Cart quotes against the store pricing policy
//! - Amount validation and display formatting
//! - Which payment providers to show
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { quote_cart } from 'storefront-wasm';
//!
//! await init();
//!
//! const options = await fetch('/api/checkout/options').then(r => r.json());
//! const quote = quote_cart(
//!   [{ price: '25.00', quantity: 2 }],
//!   options.pricing,
//! );
//!
//! console.log('Total:', quote.total);
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_core::{
    parse_amount, round_money, validate_cart_lines, CartLine, PaymentProviderKind, PriceQuote,
    PricingEngine, PricingPolicy, ProviderAvailability, SettingsMap, ShopResult,
};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

/// Cart item for WASM interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[wasm_bindgen]
pub struct WasmCartItem {
    product_id: i64,
    name: String,
    price: String,
    quantity: u32,
}

#[wasm_bindgen]
impl WasmCartItem {
    #[wasm_bindgen(constructor)]
    pub fn new(product_id: i64, name: String, price: String, quantity: u32) -> Self {
        Self {
            product_id,
            name,
            price,
            quantity,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn product_id(&self) -> i64 {
        self.product_id
    }

    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn price(&self) -> String {
        self.price.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Line total as a 2-place decimal string; empty when the price is not a number
    #[wasm_bindgen]
    pub fn line_total(&self) -> String {
        self.cart_line()
            .and_then(|line| line.line_total())
            .map(|total| round_money(total).to_string())
            .unwrap_or_default()
    }

    /// Format total for display
    #[wasm_bindgen]
    pub fn format_total(&self) -> String {
        format_money(&self.line_total())
    }
}

impl WasmCartItem {
    fn cart_line(&self) -> Option<CartLine> {
        Decimal::from_str(self.price.trim())
            .ok()
            .map(|price| CartLine::new(price, self.quantity))
    }
}

/// Price a cart in the browser.
///
/// `items` is an array of `{ price, quantity }`; `policy` is the `pricing`
/// object from `/api/checkout/options`, or `undefined` for store defaults.
#[wasm_bindgen]
pub fn quote_cart(items: JsValue, policy: JsValue) -> Result<JsValue, JsValue> {
    let items: Vec<CartLine> = serde_wasm_bindgen::from_value(items)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart items: {}", e)))?;

    let policy: Option<PricingPolicy> = if policy.is_undefined() || policy.is_null() {
        None
    } else {
        Some(
            serde_wasm_bindgen::from_value(policy)
                .map_err(|e| JsValue::from_str(&format!("Invalid pricing policy: {}", e)))?,
        )
    };

    let quote = quote_lines(items, policy).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&quote).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Providers the checkout page should show for a settings snapshot
#[wasm_bindgen]
pub fn offered_providers(settings: JsValue, paypal_enabled: bool) -> Result<JsValue, JsValue> {
    let settings: SettingsMap = serde_wasm_bindgen::from_value(settings)
        .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))?;

    let offered = providers_for(&settings, paypal_enabled);
    serde_wasm_bindgen::to_value(&offered).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format a decimal amount for display, e.g. `"63.99"` -> `"$63.99"`
#[wasm_bindgen]
pub fn format_money(amount: &str) -> String {
    match Decimal::from_str(amount.trim()) {
        Ok(value) if value.is_sign_negative() => format!("-${}", round_money(value.abs())),
        Ok(value) => format!("${}", round_money(value)),
        Err(_) => String::new(),
    }
}

/// Whether the server will accept `amount` for a payment
#[wasm_bindgen]
pub fn validate_amount(amount: &str) -> bool {
    parse_amount(amount).is_ok()
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn quote_lines(items: Vec<CartLine>, policy: Option<PricingPolicy>) -> ShopResult<PriceQuote> {
    validate_cart_lines(&items)?;
    PricingEngine::new(policy.unwrap_or_default()).quote(items)
}

fn providers_for(settings: &SettingsMap, paypal_enabled: bool) -> Vec<PaymentProviderKind> {
    ProviderAvailability::from_settings(settings, paypal_enabled).offered()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::settings::keys;

    #[test]
    fn test_cart_item_total() {
        let item = WasmCartItem::new(1, "Linen Shirt".to_string(), "19.99".to_string(), 2);
        assert_eq!(item.line_total(), "39.98");
        assert_eq!(item.format_total(), "$39.98");

        let broken = WasmCartItem::new(2, "Broken".to_string(), "abc".to_string(), 1);
        assert_eq!(broken.line_total(), "");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("19.99"), "$19.99");
        assert_eq!(format_money("1"), "$1.00");
        assert_eq!(format_money("-2.5"), "-$2.50");
        assert_eq!(format_money("nope"), "");
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("10.00"));
        assert!(!validate_amount("0"));
        assert!(!validate_amount("-1"));
        assert!(!validate_amount("ten"));
        assert!(!validate_amount("0.001"));
    }

    #[test]
    fn test_quote_rejects_out_of_range_lines() {
        let huge = Decimal::from_str("79228162514264337593543950335").unwrap();
        assert!(quote_lines(vec![CartLine::new(huge, 2)], None).is_err());
        assert!(quote_lines(vec![CartLine::new(Decimal::ONE, 10_000)], None).is_err());
    }

    #[test]
    fn test_quote_uses_defaults_without_policy() {
        let quote = quote_lines(
            vec![CartLine::new(Decimal::new(2500, 2), 2)],
            None,
        )
        .unwrap();
        assert_eq!(quote.subtotal.to_string(), "50.00");
        assert_eq!(quote.shipping.to_string(), "9.99");
        assert_eq!(quote.tax.to_string(), "4.00");
        assert_eq!(quote.total.to_string(), "63.99");
    }

    #[test]
    fn test_quote_with_store_policy() {
        let policy = PricingPolicy::new(Decimal::ZERO, Decimal::new(40, 0), Decimal::new(5, 0));
        let quote = quote_lines(vec![CartLine::new(Decimal::new(4000, 2), 1)], Some(policy)).unwrap();
        assert!(quote.ships_free());
        assert_eq!(quote.total.to_string(), "40.00");
    }

    #[test]
    fn test_providers_for_settings() {
        let settings = SettingsMap::new();
        assert_eq!(
            providers_for(&settings, false),
            vec![PaymentProviderKind::Stripe, PaymentProviderKind::PayPal]
        );

        let mut settings = SettingsMap::new();
        settings.insert(keys::COD_ENABLED.into(), "true".into());
        assert_eq!(
            providers_for(&settings, false),
            vec![PaymentProviderKind::CashOnDelivery]
        );
    }
}
