//! # Pricing Engine
//!
//! Deterministic, side-effect-free order financials.
//!
//! ```text
//! subtotal = Σ(unit_price × quantity)
//! shipping = 0 if subtotal ≥ free_shipping_threshold else flat_shipping_rate
//! tax      = subtotal × tax_rate          (shipping is never taxed)
//! total    = subtotal + shipping + tax
//! ```
//!
//! Every component is rounded to 2 decimal places (midpoint away from zero)
//! and `total` is summed from the rounded parts, so the persisted invariant
//! `total == subtotal + shipping + tax` holds exactly.

use crate::error::{ShopError, ShopResult, ValidationErrors};
use crate::settings::{keys, non_empty, SettingsMap};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Decimal places used for every persisted or displayed amount
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Tolerance when comparing client-computed amounts (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest unit price accepted on a cart line (1,000,000)
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest quantity accepted on a cart line
pub const MAX_QUANTITY: u32 = 9_999;

/// Largest order-level or payment amount accepted (1,000,000,000,000)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Round to 2 decimal places and pin the scale so `4` prints as `4.00`
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DECIMAL_PLACES);
    rounded
}

/// Parse a payment amount. It must still be positive once rounded to
/// cents and must not exceed `MAX_AMOUNT`.
pub fn parse_amount(raw: &str) -> ShopResult<Decimal> {
    let raw = raw.trim();
    let amount = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ShopError::InvalidAmount)?;

    if amount > MAX_AMOUNT || round_money(amount) <= Decimal::ZERO {
        return Err(ShopError::InvalidAmount);
    }
    Ok(amount)
}

/// Check cart lines against the price and quantity limits.
/// Field names follow the `items.{index}.{field}` convention.
pub fn validate_cart_lines(lines: &[CartLine]) -> ShopResult<()> {
    let mut errors = ValidationErrors::new();
    for (index, line) in lines.iter().enumerate() {
        check_unit_price(&mut errors, &format!("items.{}.price", index), line.unit_price);
        check_quantity(&mut errors, &format!("items.{}.quantity", index), line.quantity);
    }
    errors.into_result()
}

pub(crate) fn check_unit_price(errors: &mut ValidationErrors, field: &str, price: Decimal) -> bool {
    if price < Decimal::ZERO {
        errors.field(field, "Must not be negative");
        false
    } else if price > MAX_UNIT_PRICE {
        errors.field(field, format!("Must not exceed {}", MAX_UNIT_PRICE));
        false
    } else {
        true
    }
}

pub(crate) fn check_quantity(errors: &mut ValidationErrors, field: &str, quantity: u32) -> bool {
    if quantity == 0 {
        errors.field(field, "Quantity must be at least 1");
        false
    } else if quantity > MAX_QUANTITY {
        errors.field(field, format!("Quantity must not exceed {}", MAX_QUANTITY));
        false
    } else {
        true
    }
}

fn too_large() -> ShopError {
    ShopError::Validation(ValidationErrors::from_message("Order amount is too large"))
}

/// Store pricing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    /// Fraction, e.g. `0.08` for 8%
    pub tax_rate: Decimal,
    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Decimal,
    /// Shipping charged below the threshold
    pub flat_shipping_rate: Decimal,
}

impl PricingPolicy {
    pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);
    pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(75, 0, 0, false, 0);
    pub const DEFAULT_FLAT_SHIPPING_RATE: Decimal = Decimal::from_parts(999, 0, 0, false, 2);

    pub fn new(
        tax_rate: Decimal,
        free_shipping_threshold: Decimal,
        flat_shipping_rate: Decimal,
    ) -> Self {
        Self {
            tax_rate,
            free_shipping_threshold,
            flat_shipping_rate,
        }
    }

    /// Read the policy from settings; missing or unparseable values fall
    /// back to the storefront defaults.
    pub fn from_settings(settings: &SettingsMap) -> Self {
        Self {
            tax_rate: setting_decimal(settings, keys::TAX_RATE, Self::DEFAULT_TAX_RATE),
            free_shipping_threshold: setting_decimal(
                settings,
                keys::FREE_SHIPPING_THRESHOLD,
                Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
            ),
            flat_shipping_rate: setting_decimal(
                settings,
                keys::SHIPPING_FLAT_RATE,
                Self::DEFAULT_FLAT_SHIPPING_RATE,
            ),
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_TAX_RATE,
            Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
            Self::DEFAULT_FLAT_SHIPPING_RATE,
        )
    }
}

fn setting_decimal(settings: &SettingsMap, key: &str, default: Decimal) -> Decimal {
    match non_empty(settings, key) {
        None => default,
        Some(raw) => Decimal::from_str(raw).unwrap_or_else(|_| {
            warn!("Setting {}={:?} is not a decimal, using {}", key, raw, default);
            default
        }),
    }
}

/// One priced cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// `None` when the product does not fit in a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Computed order financials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PriceQuote {
    /// Free shipping was applied
    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Applies a `PricingPolicy` to cart lines
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Price a cart. Fails with a validation error instead of overflowing.
    pub fn quote<I>(&self, lines: I) -> ShopResult<PriceQuote>
    where
        I: IntoIterator<Item = CartLine>,
    {
        let mut raw_subtotal = Decimal::ZERO;
        for line in lines {
            raw_subtotal = line
                .line_total()
                .and_then(|total| raw_subtotal.checked_add(total))
                .ok_or_else(too_large)?;
        }

        let shipping = if raw_subtotal >= self.policy.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.policy.flat_shipping_rate
        };

        let subtotal = round_money(raw_subtotal);
        let shipping = round_money(shipping);
        let tax = raw_subtotal
            .checked_mul(self.policy.tax_rate)
            .map(round_money)
            .ok_or_else(too_large)?;
        let total = subtotal
            .checked_add(shipping)
            .and_then(|sum| sum.checked_add(tax))
            .ok_or_else(too_large)?;

        Ok(PriceQuote {
            subtotal,
            shipping,
            tax,
            total,
        })
    }
}
