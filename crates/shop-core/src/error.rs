//! # Shop Error Types
//!
//! Typed error handling for the storefront checkout core.
//! All core operations return `Result<T, ShopError>`.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-level validation failures, shaped like a flattened schema error:
/// `{ "formErrors": [...], "fieldErrors": { "field": [...] } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a named field
    pub fn field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record an error that is not tied to one field
    pub fn form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise a `ShopError::Validation`
    pub fn into_result(self) -> ShopResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ShopError::Validation(self))
        }
    }

    /// Single form-level error (used for payloads that fail to deserialize)
    pub fn from_message(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.form(message);
        errors
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Malformed or missing request fields
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Request is structurally valid but unusable (e.g. empty provider order id)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment amount is not a finite positive decimal
    #[error("Invalid amount")]
    InvalidAmount,

    /// Admin-only operation without an admin session
    #[error("Unauthorized")]
    Unauthorized,

    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Payment provider is switched off in settings
    #[error("{provider} is not enabled")]
    ProviderDisabled { provider: String },

    /// Payment provider is enabled but has no usable credentials
    #[error("{0} is not configured")]
    NotConfigured(String),

    /// Provider rejected our credentials when requesting an access token
    #[error("Upstream auth error [{provider}]: {message}")]
    UpstreamAuth { provider: String, message: String },

    /// Provider API returned a non-success response
    #[error("Upstream request error [{provider}]: {message}")]
    UpstreamRequest { provider: String, message: String },

    /// Network/HTTP error communicating with a provider
    #[error("Network error: {0}")]
    Network(String),

    /// Too many failed admin login attempts
    #[error("Too many attempts, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Uniqueness conflict on a natural key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generated order number collided with an existing one
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// Configuration errors (unreadable seed file, bad client setup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if a single retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::Network(_) | ShopError::DuplicateOrderNumber(_)
        )
    }

    /// Errors whose detail is for operators only and must be redacted
    /// before reaching a browser
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ShopError::UpstreamAuth { .. }
                | ShopError::UpstreamRequest { .. }
                | ShopError::Network(_)
        )
    }

    /// Message safe to show to an end user
    pub fn public_message(&self) -> String {
        match self {
            ShopError::Validation(_) => "Validation failed".to_string(),
            ShopError::UpstreamAuth { .. }
            | ShopError::UpstreamRequest { .. }
            | ShopError::Network(_) => "Payment provider request failed".to_string(),
            ShopError::Configuration(_)
            | ShopError::Serialization(_)
            | ShopError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) => 400,
            ShopError::InvalidRequest(_) => 400,
            ShopError::InvalidAmount => 400,
            ShopError::Unauthorized => 401,
            ShopError::NotFound { .. } => 404,
            ShopError::ProviderDisabled { .. } => 400,
            ShopError::NotConfigured(_) => 500,
            ShopError::UpstreamAuth { .. } => 500,
            ShopError::UpstreamRequest { .. } => 500,
            ShopError::Network(_) => 500,
            ShopError::RateLimited { .. } => 429,
            ShopError::Conflict(_) => 409,
            ShopError::DuplicateOrderNumber(_) => 409,
            ShopError::Configuration(_) => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

/// Result type alias for checkout operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::Network("timeout".into()).is_retryable());
        assert!(ShopError::DuplicateOrderNumber("NVZ-1-AAAA".into()).is_retryable());
        assert!(!ShopError::InvalidAmount.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidAmount.status_code(), 400);
        assert_eq!(ShopError::Unauthorized.status_code(), 401);
        assert_eq!(ShopError::not_found("Order", 7).status_code(), 404);
        assert_eq!(
            ShopError::ProviderDisabled {
                provider: "PayPal".into()
            }
            .status_code(),
            400
        );
        assert_eq!(ShopError::NotConfigured("PayPal".into()).status_code(), 500);
        assert_eq!(
            ShopError::RateLimited {
                retry_after_secs: 60
            }
            .status_code(),
            429
        );
        assert_eq!(ShopError::Conflict("email".into()).status_code(), 409);
    }

    #[test]
    fn test_upstream_detail_is_redacted() {
        let err = ShopError::UpstreamAuth {
            provider: "paypal".into(),
            message: "{\"error\":\"invalid_client\"}".into(),
        };
        assert!(err.is_upstream());
        assert!(!err.public_message().contains("invalid_client"));
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_validation_errors_collect() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.field("customerEmail", "Required");
        errors.field("customerEmail", "Invalid email");
        errors.form("Order has no items");

        assert_eq!(errors.field_errors["customerEmail"].len(), 2);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["formErrors"][0], "Order has no items");
        assert!(matches!(errors.into_result(), Err(ShopError::Validation(_))));
    }
}
