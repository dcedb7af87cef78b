//! # Order Service
//!
//! Validates checkout drafts, numbers and persists orders, and applies admin
//! updates.

use crate::error::{ShopError, ShopResult};
use crate::order::{NewOrder, Order, OrderDraft, OrderPatch, OrderStatus, TrackingView};
use crate::order_number::{normalize_prefix, OrderNumberGenerator, TimestampOrderNumbers};
use crate::pricing::round_money;
use crate::provider::{PaymentCapture, DEFAULT_CURRENCY};
use crate::settings::{keys, BoxedSettingsStore};
use crate::store::BoxedOrderRepository;
use std::sync::Arc;
use tracing::{info, warn};

/// How many fresh order numbers to try before giving up
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct OrderService {
    orders: BoxedOrderRepository,
    settings: BoxedSettingsStore,
    numbers: Arc<dyn OrderNumberGenerator>,
    fallback_prefix: String,
}

impl OrderService {
    pub fn new(orders: BoxedOrderRepository, settings: BoxedSettingsStore) -> Self {
        Self {
            orders,
            settings,
            numbers: Arc::new(TimestampOrderNumbers),
            fallback_prefix: crate::order_number::DEFAULT_ORDER_PREFIX.to_string(),
        }
    }

    /// Replace the order number generator
    pub fn with_numbers(mut self, numbers: Arc<dyn OrderNumberGenerator>) -> Self {
        self.numbers = numbers;
        self
    }

    /// Prefix used when the `orderPrefix` setting is not set
    pub fn with_fallback_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fallback_prefix = prefix.into();
        self
    }

    async fn order_prefix(&self) -> ShopResult<String> {
        let configured = self.settings.get(keys::ORDER_PREFIX).await?;
        let prefix = configured
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.fallback_prefix.as_str());
        Ok(normalize_prefix(prefix).to_string())
    }

    /// Validate `draft` and persist it as a new `pending` order
    pub async fn create_order(&self, draft: &OrderDraft) -> ShopResult<Order> {
        let snapshot = draft.validate()?;
        let prefix = self.order_prefix().await?;

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order_number = self.numbers.generate(&prefix);
            match self
                .orders
                .insert(NewOrder::new(order_number, snapshot.clone()))
                .await
            {
                Ok(order) => {
                    info!(
                        "Created order {} ({} items, total {})",
                        order.order_number,
                        order.item_count(),
                        order.total
                    );
                    return Ok(order);
                }
                Err(ShopError::DuplicateOrderNumber(number)) => {
                    warn!(
                        "Order number {} already taken (attempt {}/{})",
                        number, attempt, MAX_ORDER_NUMBER_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(ShopError::Conflict(
            "Could not allocate a unique order number".to_string(),
        ))
    }

    /// Apply an admin patch
    pub async fn update_order(&self, id: i64, patch: OrderPatch) -> ShopResult<Order> {
        let status = patch.status;
        let order = self
            .orders
            .update(id, patch)
            .await?
            .ok_or_else(|| ShopError::not_found("Order", id))?;

        if let Some(status) = status {
            info!("Order {} moved to {}", order.order_number, status);
        }
        Ok(order)
    }

    pub async fn list_orders(&self) -> ShopResult<Vec<Order>> {
        self.orders.list().await
    }

    pub async fn clear_orders(&self) -> ShopResult<u64> {
        let removed = self.orders.clear().await?;
        warn!("Cleared {} orders", removed);
        Ok(removed)
    }

    /// Public tracking lookup
    pub async fn get_by_order_number(&self, order_number: &str) -> ShopResult<TrackingView> {
        self.orders
            .find_by_number(order_number.trim())
            .await?
            .map(|order| TrackingView::from(&order))
            .ok_or_else(|| ShopError::not_found("Order", order_number))
    }

    /// Record a completed online payment against a pending order.
    ///
    /// The capture must come from the provider the order was placed with and
    /// must cover exactly the order total in the store currency; anything
    /// else is a `Conflict` and the order is left untouched.
    pub async fn mark_paid(&self, order_number: &str, capture: &PaymentCapture) -> ShopResult<Order> {
        if !capture.is_completed() {
            return Err(ShopError::InvalidRequest(
                "Payment has not been completed".to_string(),
            ));
        }

        let order = self
            .orders
            .find_by_number(order_number.trim())
            .await?
            .ok_or_else(|| ShopError::not_found("Order", order_number))?;

        let store_currency = self
            .settings
            .get(keys::CURRENCY)
            .await?
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        if let Err(reason) = capture_matches(&order, capture, &store_currency) {
            warn!(
                "Capture {} ({}) not applied to order {}: {}",
                capture.reference, capture.provider, order.order_number, reason
            );
            return Err(ShopError::Conflict(format!(
                "Payment does not match order {}: {}",
                order.order_number, reason
            )));
        }

        let patch = OrderPatch {
            status: Some(OrderStatus::Paid),
            ..OrderPatch::default()
        };
        self.update_order(order.id, patch).await
    }
}

fn capture_matches(order: &Order, capture: &PaymentCapture, currency: &str) -> Result<(), &'static str> {
    if order.status != OrderStatus::Pending {
        return Err("order is not awaiting payment");
    }
    if order.payment_provider != Some(capture.provider) {
        return Err("order was placed with a different payment method");
    }
    match capture.amount {
        Some(amount) if round_money(amount) == order.total => {}
        _ => return Err("captured amount differs from order total"),
    }
    match capture.currency.as_deref() {
        Some(c) if c.eq_ignore_ascii_case(currency) => Ok(()),
        _ => Err("captured currency differs from store currency"),
    }
}
