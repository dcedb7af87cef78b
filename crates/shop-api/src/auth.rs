//! # Admin Authentication
//!
//! Single admin account from `ADMIN_USERNAME` / `ADMIN_PASSWORD`. A successful
//! login issues an opaque bearer token held in process memory.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use shop_core::ShopError;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Admin session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

/// Configured admin credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        // Evaluate both so timing does not reveal which one failed
        let user_ok = constant_time_compare(&self.username, username);
        let pass_ok = constant_time_compare(&self.password, password);
        user_ok & pass_ok
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Live admin sessions keyed by token
#[derive(Clone)]
pub struct AdminSessions {
    sessions: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    ttl: Duration,
}

impl Default for AdminSessions {
    fn default() -> Self {
        Self::new(Duration::hours(SESSION_TTL_HOURS))
    }
}

impl AdminSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Start a session and return its token
    pub async fn issue(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);
        token
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(token)
            .map(|expiry| *expiry > Utc::now())
            .unwrap_or(false)
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor guarding admin-only handlers
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Err(ShopError::Unauthorized.into());
        };

        if state.sessions.is_valid(token).await {
            Ok(RequireAdmin)
        } else {
            warn!("Rejected admin request to {}", parts.uri.path());
            Err(ShopError::Unauthorized.into())
        }
    }
}

/// Caller identity for login throttling: the peer address, or the first
/// `X-Forwarded-For` hop when `AppConfig::trust_forwarded_for` is set.
/// Falls back to `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|h| trust_forwarded_for && !h.is_empty());

        if let Some(ip) = forwarded {
            return ClientKey(ip.to_string());
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        ClientKey(peer.unwrap_or_else(|| "unknown".to_string()))
    }
}

impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientKey::from_parts(parts, state.config.trust_forwarded_for))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_credentials_verify() {
        let creds = AdminCredentials::new("admin", "s3cret");
        assert!(creds.verify("admin", "s3cret"));
        assert!(!creds.verify("admin", "s3cre"));
        assert!(!creds.verify("root", "s3cret"));
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }

    fn parts(forwarded: Option<&'static str>, peer: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/api/admin/login");
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        if let Some(peer) = peer {
            parts
                .extensions
                .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        }
        parts
    }

    #[test]
    fn test_client_key_ignores_forwarded_for_by_default() {
        let spoofed = parts(Some("203.0.113.7, 10.0.0.1"), Some("192.0.2.10:5123"));
        assert_eq!(ClientKey::from_parts(&spoofed, false).0, "192.0.2.10");
        assert_eq!(ClientKey::from_parts(&spoofed, true).0, "203.0.113.7");

        let bare = parts(Some("203.0.113.7"), None);
        assert_eq!(ClientKey::from_parts(&bare, false).0, "unknown");
        assert_eq!(ClientKey::from_parts(&parts(None, None), true).0, "unknown");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = AdminSessions::default();
        let token = sessions.issue().await;

        assert!(sessions.is_valid(&token).await);
        assert!(!sessions.is_valid("forged").await);

        sessions.revoke(&token).await;
        assert!(!sessions.is_valid(&token).await);
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let sessions = AdminSessions::new(Duration::seconds(-1));
        let token = sessions.issue().await;
        assert!(!sessions.is_valid(&token).await);
    }
}
