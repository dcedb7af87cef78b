//! # Order Types
//!
//! Orders, the customer-submitted draft they are created from, admin patches,
//! and the public tracking projection.

use crate::error::{ShopError, ShopResult, ValidationErrors};
use crate::pricing::{
    check_quantity, check_unit_price, round_money, MAX_AMOUNT, MAX_QUANTITY,
    MONEY_TOLERANCE,
};
use crate::provider::PaymentProviderKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    Paid,
    Packed,
    Shipped,
    Delivered,
    Refunded,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "packed" => Ok(OrderStatus::Packed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(ShopError::InvalidRequest(format!(
                "Unknown order status: {}",
                other
            ))),
        }
    }
}

/// Gate for every status change.
///
/// Admins may move an order to any status, including backwards, to correct
/// mistakes by hand. A transition graph belongs here when one is adopted.
pub fn check_transition(_from: OrderStatus, _to: OrderStatus) -> ShopResult<()> {
    Ok(())
}

/// Point-in-time snapshot of a purchased product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    pub name: String,
    /// Unit price at purchase time
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    /// `None` when the product does not fit in a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_provider: Option<PaymentProviderKind>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Validated checkout content, ready to be numbered and stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSnapshot {
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_provider: Option<PaymentProviderKind>,
}

/// An order ready for insertion; the repository assigns `id`
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub snapshot: CheckoutSnapshot,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_number: impl Into<String>, snapshot: CheckoutSnapshot) -> Self {
        Self {
            order_number: order_number.into(),
            snapshot,
            created_at: Utc::now(),
        }
    }

    /// Materialize with the assigned id. New orders are always `pending`.
    pub fn into_order(self, id: i64) -> Order {
        let s = self.snapshot;
        Order {
            id,
            order_number: self.order_number,
            customer_name: s.customer_name,
            customer_email: s.customer_email,
            shipping_address: s.shipping_address,
            items: s.items,
            subtotal: s.subtotal,
            shipping: s.shipping,
            tax: s.tax,
            total: s.total,
            payment_provider: s.payment_provider,
            status: OrderStatus::Pending,
            tracking_number: None,
            created_at: self.created_at,
        }
    }
}

/// Cart line as submitted by the storefront
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftItem {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub price: Option<Value>,
    pub quantity: Option<i64>,
    pub image: Option<String>,
}

/// Order as submitted by the storefront checkout.
///
/// Everything is optional at the type level so a bad payload produces
/// field-level errors instead of a single parse failure. `status` and
/// `orderNumber` are accepted and ignored; the server owns both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDraft {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
    pub items: Option<Vec<DraftItem>>,
    pub subtotal: Option<Value>,
    pub shipping: Option<Value>,
    pub tax: Option<Value>,
    pub total: Option<Value>,
    pub payment_provider: Option<String>,
    pub status: Option<String>,
    pub order_number: Option<String>,
}

impl OrderDraft {
    /// Check the draft and produce a snapshot, or every problem found
    pub fn validate(&self) -> ShopResult<CheckoutSnapshot> {
        let mut errors = ValidationErrors::new();

        let customer_name = required_text(&mut errors, "customerName", &self.customer_name);
        let customer_email = required_text(&mut errors, "customerEmail", &self.customer_email);
        if let Some(email) = &customer_email {
            if !looks_like_email(email) {
                errors.field("customerEmail", "Invalid email");
            }
        }
        let shipping_address =
            required_text(&mut errors, "shippingAddress", &self.shipping_address);

        let items = self.validate_items(&mut errors);

        let subtotal = money_field(&mut errors, "subtotal", &self.subtotal);
        let shipping = money_field(&mut errors, "shipping", &self.shipping);
        let tax = money_field(&mut errors, "tax", &self.tax);
        let total = money_field(&mut errors, "total", &self.total);

        let payment_provider = match self.payment_provider.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<PaymentProviderKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.field("paymentProvider", "Expected stripe, paypal or cod");
                    None
                }
            },
        };

        if let (Some(subtotal), Some(shipping), Some(tax), Some(total)) =
            (subtotal, shipping, tax, total)
        {
            if (subtotal + shipping + tax - total).abs() > MONEY_TOLERANCE {
                errors.field("total", "Total must equal subtotal + shipping + tax");
            }
            if !items.is_empty() {
                let items_sum = items.iter().try_fold(Decimal::ZERO, |sum, item| {
                    item.line_total().and_then(|line| sum.checked_add(line))
                });
                let matches = items_sum
                    .map(|sum| (sum - subtotal).abs() <= MONEY_TOLERANCE)
                    .unwrap_or(false);
                if !matches {
                    errors.field("subtotal", "Subtotal must equal the sum of the items");
                }
            }
        }

        errors.into_result()?;

        // Every Option below is Some once no errors were recorded
        match (
            customer_name,
            customer_email,
            shipping_address,
            subtotal,
            shipping,
            tax,
            total,
        ) {
            (
                Some(customer_name),
                Some(customer_email),
                Some(shipping_address),
                Some(subtotal),
                Some(shipping),
                Some(tax),
                Some(total),
            ) => Ok(CheckoutSnapshot {
                customer_name,
                customer_email,
                shipping_address,
                items,
                subtotal: round_money(subtotal),
                shipping: round_money(shipping),
                tax: round_money(tax),
                total: round_money(total),
                payment_provider,
            }),
            _ => Err(ShopError::Internal(
                "Order draft passed validation with missing fields".to_string(),
            )),
        }
    }

    fn validate_items(&self, errors: &mut ValidationErrors) -> Vec<LineItem> {
        let drafts = match &self.items {
            Some(items) if !items.is_empty() => items,
            _ => {
                errors.field("items", "Order must contain at least one item");
                return Vec::new();
            }
        };

        let mut items = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.iter().enumerate() {
            let path = |field: &str| format!("items.{}.{}", index, field);

            let product_id = match draft.product_id {
                Some(id) => Some(id),
                None => {
                    errors.field(path("productId"), "Required");
                    None
                }
            };
            let name = required_text(errors, &path("name"), &draft.name);
            let price = money_field(errors, &path("price"), &draft.price)
                .filter(|price| check_unit_price(errors, &path("price"), *price));
            let quantity = match draft.quantity {
                Some(q) if q < 1 => {
                    errors.field(path("quantity"), "Quantity must be at least 1");
                    None
                }
                Some(q) => match u32::try_from(q) {
                    Ok(q) if check_quantity(errors, &path("quantity"), q) => Some(q),
                    Ok(_) => None,
                    Err(_) => {
                        errors.field(
                            path("quantity"),
                            format!("Quantity must not exceed {}", MAX_QUANTITY),
                        );
                        None
                    }
                },
                None => {
                    errors.field(path("quantity"), "Required");
                    None
                }
            };

            if let (Some(product_id), Some(name), Some(price), Some(quantity)) =
                (product_id, name, price, quantity)
            {
                items.push(LineItem {
                    product_id,
                    name,
                    price,
                    quantity,
                    image: draft.image.clone().filter(|i| !i.trim().is_empty()),
                });
            }
        }
        items
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &Option<String>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            errors.field(field, "Required");
            None
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Money arrives as a decimal string (`"63.99"`) or a JSON number
fn parse_money_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        _ => None,
    }
}

fn money_field(errors: &mut ValidationErrors, field: &str, value: &Option<Value>) -> Option<Decimal> {
    let Some(value) = value.as_ref().filter(|v| !v.is_null()) else {
        errors.field(field, "Required");
        return None;
    };
    match parse_money_value(value) {
        Some(amount) if amount > MAX_AMOUNT => {
            errors.field(field, format!("Must not exceed {}", MAX_AMOUNT));
            None
        }
        Some(amount) if amount >= Decimal::ZERO => Some(amount),
        Some(_) => {
            errors.field(field, "Must not be negative");
            None
        }
        None => {
            errors.field(field, "Expected a decimal amount");
            None
        }
    }
}

/// Admin update. `id`, `orderNumber` and `createdAt` are not patchable and are
/// ignored if sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    /// Empty string clears the tracking number
    pub tracking_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub subtotal: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
    pub payment_provider: Option<PaymentProviderKind>,
}

impl OrderPatch {
    /// Patch that only moves the status
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply onto `order`. Fields are written as given; totals are not
    /// recomputed.
    pub fn apply(self, order: &mut Order) -> ShopResult<()> {
        if let Some(status) = self.status {
            check_transition(order.status, status)?;
            order.status = status;
        }
        if let Some(tracking) = self.tracking_number {
            let tracking = tracking.trim();
            order.tracking_number = (!tracking.is_empty()).then(|| tracking.to_string());
        }
        if let Some(name) = self.customer_name {
            order.customer_name = name;
        }
        if let Some(email) = self.customer_email {
            order.customer_email = email;
        }
        if let Some(address) = self.shipping_address {
            order.shipping_address = address;
        }
        if let Some(items) = self.items {
            order.items = items;
        }
        if let Some(subtotal) = self.subtotal {
            order.subtotal = round_money(subtotal);
        }
        if let Some(shipping) = self.shipping {
            order.shipping = round_money(shipping);
        }
        if let Some(tax) = self.tax {
            order.tax = round_money(tax);
        }
        if let Some(total) = self.total {
            order.total = round_money(total);
        }
        if let Some(provider) = self.payment_provider {
            order.payment_provider = Some(provider);
        }
        Ok(())
    }
}

/// Public order-tracking view. Carries no customer contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for TrackingView {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status,
            items: order.items.clone(),
            total: order.total,
            tracking_number: order.tracking_number.clone(),
            created_at: order.created_at,
        }
    }
}
