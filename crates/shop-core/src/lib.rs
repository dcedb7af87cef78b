//! # shop-core
//!
//! Core types and traits for the storefront checkout engine.
//!
//! This crate provides:
//! - `PricingEngine` and `PricingPolicy` for subtotal, shipping, tax and total
//! - `SettingsStore` for the runtime key-value configuration
//! - `PaymentProvider` trait and `PaymentProviderKind` for payment dispatch
//! - `OrderService` for validating, numbering and persisting orders
//! - `LoginAttemptTracker` for admin login throttling
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartLine, PricingEngine, PricingPolicy};
//!
//! let settings = settings_store.all().await?;
//! let engine = PricingEngine::new(PricingPolicy::from_settings(&settings));
//! let quote = engine.quote([CartLine::new(unit_price, 2)])?;
//!
//! // Submit the snapshot
//! let order = order_service.create_order(&draft).await?;
//! println!("Track with {}", order.order_number);
//! ```

pub mod error;
pub mod login;
pub mod order;
pub mod order_number;
pub mod pricing;
pub mod provider;
pub mod service;
pub mod settings;
pub mod store;

// Re-exports for convenience
pub use error::{ShopError, ShopResult, ValidationErrors};
pub use login::{BoxedLoginAttemptTracker, InMemoryLoginAttempts, LoginAttemptTracker};
pub use order::{
    check_transition, CheckoutSnapshot, DraftItem, LineItem, NewOrder, Order, OrderDraft,
    OrderPatch, OrderStatus, TrackingView,
};
pub use order_number::{OrderNumberGenerator, TimestampOrderNumbers, DEFAULT_ORDER_PREFIX};
pub use pricing::{
    parse_amount, round_money, validate_cart_lines, CartLine, PriceQuote, PricingEngine,
    PricingPolicy, MAX_AMOUNT, MAX_QUANTITY, MAX_UNIT_PRICE,
};
pub use provider::{
    BoxedPaymentProvider, CaptureStatus, CashOnDeliveryProvider, IntentRequest, IntentStatus,
    PaymentCapture, PaymentIntent, PaymentProvider, PaymentProviderKind, PaymentProviders,
    ProviderAvailability, StripeProvider, DEFAULT_CURRENCY,
};
pub use service::OrderService;
pub use settings::{
    BoxedSettingsStore, InMemorySettingsStore, SettingsMap, SettingsStore,
};
pub use store::{BoxedOrderRepository, InMemoryOrderRepository, OrderRepository};
