//! # shop-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Order placement, admin order management and public tracking
//! - PayPal create/capture endpoints and generic provider dispatch
//! - Settings read/update with secrets kept out of public reads
//! - Admin login with bearer sessions and attempt throttling
//!
//! ## Endpoints
//!
//! | Method | Path | Access |
//! |--------|------|--------|
//! | GET | `/health` | public |
//! | POST | `/api/orders` | public |
//! | GET / DELETE | `/api/orders` | admin |
//! | PATCH | `/api/orders/{id}` | admin |
//! | GET | `/api/track/{order_number}` | public |
//! | GET | `/api/paypal/config` | public |
//! | POST | `/api/paypal/create-order` | public |
//! | POST | `/api/paypal/capture-order` | public |
//! | GET | `/api/settings` | public |
//! | PATCH | `/api/settings` | admin |
//! | GET | `/api/checkout/options` | public |
//! | POST | `/api/checkout/quote` | public |
//! | POST | `/api/payments/{provider}/intent` | public |
//! | POST | `/api/payments/{provider}/capture` | public |
//! | POST | `/api/admin/login` | public |
//! | GET | `/api/admin/session` | public |
//! | POST | `/api/admin/logout` | public |
//! | GET | `/api/admin/secrets` | admin |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
