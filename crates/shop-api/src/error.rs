//! # API Errors
//!
//! Converts `ShopError` into JSON error responses. Upstream provider detail
//! is logged here and never sent to the caller.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shop_core::{ShopError, ValidationErrors};
use tracing::{error, warn};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Handler error: a `ShopError` on its way to becoming a response
#[derive(Debug)]
pub struct ApiError(pub ShopError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ShopError::Validation(ValidationErrors::from_message(
            rejection.body_text(),
        )))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(ShopError::Validation(ValidationErrors::from_message(
            rejection.body_text(),
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let code = err.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_upstream() || code >= 500 {
            error!("Request failed: {}", err);
        } else if matches!(err, ShopError::RateLimited { .. }) {
            warn!("{}", err);
        }

        let mut body = ErrorResponse::new(err.public_message(), code);
        if let ShopError::Validation(errors) = &err {
            body = body.with_details(serde_json::to_value(errors).unwrap_or_default());
        }

        let mut response = (status, Json(body)).into_response();
        if let ShopError::RateLimited { retry_after_secs } = err {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// JSON body extractor whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameter extractor whose rejections use the API error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = ApiError(ShopError::InvalidAmount).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(ShopError::not_found("Order", 9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(ShopError::NotConfigured("PayPal".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = ApiError(ShopError::RateLimited {
            retry_after_secs: 120,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "120");
    }

    #[tokio::test]
    async fn test_path_rejection_uses_error_shape() {
        use axum::{routing::get, Router};
        use axum_test::TestServer;

        async fn show(ApiPath(id): ApiPath<i64>) -> String {
            id.to_string()
        }

        let server = TestServer::new(Router::new().route("/items/{id}", get(show))).unwrap();
        server.get("/items/42").await.assert_text("42");

        let response = server.get("/items/abc").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], 400);
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Invalid amount", 400);
        assert_eq!(err.error, "Invalid amount");
        assert_eq!(err.code, 400);
        assert!(err.details.is_none());
    }
}
