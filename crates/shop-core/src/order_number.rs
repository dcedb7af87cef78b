//! Human-readable order numbers: `{PREFIX}-{BASE36(ms timestamp)}-{4 HEX}`

use chrono::Utc;
use uuid::Uuid;

/// Prefix used when the `orderPrefix` setting is absent or blank
pub const DEFAULT_ORDER_PREFIX: &str = "NVZ";

/// Source of candidate order numbers. Uniqueness is enforced by the
/// repository; generators only need to make collisions unlikely.
pub trait OrderNumberGenerator: Send + Sync {
    fn generate(&self, prefix: &str) -> String;
}

/// Millisecond timestamp plus four random hex characters
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampOrderNumbers;

impl OrderNumberGenerator for TimestampOrderNumbers {
    fn generate(&self, prefix: &str) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            normalize_prefix(prefix),
            to_base36(millis),
            random[..4].to_uppercase()
        )
    }
}

/// Trimmed prefix, falling back to `NVZ`
pub fn normalize_prefix(prefix: &str) -> &str {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        DEFAULT_ORDER_PREFIX
    } else {
        prefix
    }
}

/// Uppercase base-36 rendering
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
