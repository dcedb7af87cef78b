//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Orders:
///   - POST   /api/orders - Place an order (public)
///   - GET    /api/orders - List orders (admin)
///   - DELETE /api/orders - Clear all orders (admin)
///   - PATCH  /api/orders/{id} - Update status/tracking (admin)
///   - GET    /api/track/{order_number} - Public tracking view
///
/// - PayPal:
///   - GET  /api/paypal/config
///   - POST /api/paypal/create-order
///   - POST /api/paypal/capture-order
///
/// - Payments (any provider):
///   - POST /api/payments/{provider}/intent
///   - POST /api/payments/{provider}/capture
///
/// - Settings & checkout:
///   - GET   /api/settings - Public settings (secrets removed)
///   - PATCH /api/settings - Update settings (admin)
///   - GET   /api/checkout/options - Offered providers and pricing policy
///   - POST  /api/checkout/quote - Server-side price quote
///
/// - Admin:
///   - POST /api/admin/login
///   - GET  /api/admin/session
///   - POST /api/admin/logout
///   - GET  /api/admin/secrets (admin)
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let order_routes = Router::new()
        .route(
            "/orders",
            get(handlers::list_orders)
                .post(handlers::create_order)
                .delete(handlers::clear_orders),
        )
        .route("/orders/{id}", patch(handlers::update_order))
        .route("/track/{order_number}", get(handlers::track_order));

    let payment_routes = Router::new()
        .route("/paypal/config", get(handlers::paypal_config))
        .route("/paypal/create-order", post(handlers::paypal_create_order))
        .route("/paypal/capture-order", post(handlers::paypal_capture_order))
        .route("/payments/{provider}/intent", post(handlers::create_payment_intent))
        .route("/payments/{provider}/capture", post(handlers::capture_payment));

    let settings_routes = Router::new()
        .route(
            "/settings",
            get(handlers::get_settings).patch(handlers::update_settings),
        )
        .route("/checkout/options", get(handlers::checkout_options))
        .route("/checkout/quote", post(handlers::checkout_quote));

    let admin_routes = Router::new()
        .route("/login", post(handlers::admin_login))
        .route("/session", get(handlers::admin_session))
        .route("/logout", post(handlers::admin_logout))
        .route("/secrets", get(handlers::admin_secrets));

    let api_routes = Router::new()
        .merge(order_routes)
        .merge(payment_routes)
        .merge(settings_routes)
        .nest("/admin", admin_routes);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
