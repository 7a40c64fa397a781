//! Environment variable names used throughout HookGate configuration

/// Listener configuration
pub const PORT: &str = "HOOKGATE_PORT";
pub const MAX_CONNECTIONS: &str = "MAX_CONNECTIONS";

/// Proxy behavior configuration
pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
pub const MAX_BODY_SIZE_MB: &str = "MAX_BODY_SIZE_MB";

/// Delivery configuration
pub const FALLBACK_STATUS_THRESHOLD: &str = "FALLBACK_STATUS_THRESHOLD";

/// Queue configuration
pub const QUEUE_CAPACITY: &str = "QUEUE_CAPACITY";
pub const QUEUE_MAX_ATTEMPTS: &str = "QUEUE_MAX_ATTEMPTS";
pub const QUEUE_REDELIVERY_DELAY_MS: &str = "QUEUE_REDELIVERY_DELAY_MS";

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        PORT,
        MAX_CONNECTIONS,
        PROXY_TIMEOUT_SECS,
        MAX_BODY_SIZE_MB,
        FALLBACK_STATUS_THRESHOLD,
        QUEUE_CAPACITY,
        QUEUE_MAX_ATTEMPTS,
        QUEUE_REDELIVERY_DELAY_MS,
    ]
}
