//! Type definitions for HookGate configuration.
//!
//! This module contains the configuration types shared by the gateway and
//! the queue listener:
//! - Proxy behavior (timeouts, body limits)
//! - Delivery behavior (fallback threshold)
//! - Queue behavior (capacity, attempts, redelivery delay)
//! - Request correlation identifiers

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// ============================================================================
// Composable Configuration Traits
// ============================================================================

/// Configuration for proxy behavior.
///
/// Implement this trait to customize upstream proxy settings.
pub trait ProxyProvider: Send + Sync {
    /// Returns the proxy configuration.
    fn proxy_config(&self) -> &ProxyConfig;
}

/// Configuration for delivery strategies.
pub trait DeliveryProvider: Send + Sync {
    /// Returns the delivery configuration.
    fn delivery_config(&self) -> &DeliveryConfig;
}

/// Configuration for the delivery queue.
pub trait QueueProvider: Send + Sync {
    /// Returns the queue configuration.
    fn queue_config(&self) -> &QueueConfig;
}

/// Configuration for connection limits.
///
/// Implement this trait to customize connection handling.
pub trait ConnectionProvider: Send + Sync {
    /// Returns the maximum number of concurrent connections.
    fn max_connections(&self) -> usize;
}

// ============================================================================
// ConfigProvider - Aggregated trait for full configuration
// ============================================================================

/// Trait for complete configuration injection.
///
/// This trait combines all specialized configuration traits into one.
/// Implement the individual traits to provide configuration from any
/// source:
/// - [`ProxyProvider`] for proxy behavior
/// - [`DeliveryProvider`] for delivery strategies
/// - [`QueueProvider`] for the delivery queue
/// - [`ConnectionProvider`] for connection limits
///
/// # Example
///
/// ```
/// use hookgate_core::{
///     ConnectionProvider, DeliveryConfig, DeliveryProvider, ProxyConfig, ProxyProvider,
///     QueueConfig, QueueProvider,
/// };
///
/// struct MyConfig {
///     proxy: ProxyConfig,
///     delivery: DeliveryConfig,
///     queue: QueueConfig,
/// }
///
/// impl ProxyProvider for MyConfig {
///     fn proxy_config(&self) -> &ProxyConfig { &self.proxy }
/// }
///
/// impl DeliveryProvider for MyConfig {
///     fn delivery_config(&self) -> &DeliveryConfig { &self.delivery }
/// }
///
/// impl QueueProvider for MyConfig {
///     fn queue_config(&self) -> &QueueConfig { &self.queue }
/// }
///
/// impl ConnectionProvider for MyConfig {
///     fn max_connections(&self) -> usize { 10_000 }
/// }
///
/// fn assert_provider<C: hookgate_core::ConfigProvider>(_: &C) {}
///
/// assert_provider(&MyConfig {
///     proxy: ProxyConfig::default(),
///     delivery: DeliveryConfig::default(),
///     queue: QueueConfig::default(),
/// });
/// ```
pub trait ConfigProvider: ProxyProvider + DeliveryProvider + QueueProvider + ConnectionProvider {}

// Blanket implementation: any type implementing all sub-traits is a ConfigProvider
impl<T> ConfigProvider for T where
    T: ProxyProvider + DeliveryProvider + QueueProvider + ConnectionProvider
{
}

/// Configuration for proxy behavior and upstream communication.
///
/// Controls timeouts and request size limits for proxied requests.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hookgate_core::ProxyConfig;
///
/// let config = ProxyConfig {
///     timeout: Duration::from_secs(30),
///     max_body_size: ProxyConfig::mb_to_bytes(10).unwrap(),
/// };
///
/// assert!(config.is_valid());
/// assert_eq!(config.max_body_size_mb(), "10");
/// ```
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Timeout for upstream requests when a rule does not set its own
    pub timeout: Duration,
    /// Maximum request body size in bytes (0 = unlimited)
    pub max_body_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::PROXY_TIMEOUT,
            max_body_size: defaults::MAX_BODY_SIZE,
        }
    }
}

impl ProxyConfig {
    /// Returns `true` if the configuration is valid.
    ///
    /// A valid configuration has a non-zero timeout.
    pub fn is_valid(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Returns the maximum body size formatted for display.
    ///
    /// Returns "unlimited" if max_body_size is 0, otherwise returns the size in MB.
    pub fn max_body_size_mb(&self) -> String {
        if self.max_body_size == 0 {
            "unlimited".to_string()
        } else {
            (self.max_body_size / 1024 / 1024).to_string()
        }
    }

    /// Converts megabytes to bytes.
    ///
    /// Returns `Some(0)` if input is 0 (representing unlimited) and `None`
    /// when the byte count does not fit in `usize`.
    pub fn mb_to_bytes(mb: usize) -> Option<usize> {
        mb.checked_mul(1024 * 1024)
    }
}

/// Configuration for delivery strategies.
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Upstream status at or above which fallback delivery queues the request
    pub fallback_status_threshold: u16,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            fallback_status_threshold: defaults::FALLBACK_STATUS_THRESHOLD,
        }
    }
}

impl DeliveryConfig {
    /// Returns `true` if the threshold is an HTTP status code.
    pub fn is_valid(&self) -> bool {
        (100..=599).contains(&self.fallback_status_threshold)
    }

    /// Returns `true` if `status` counts as an upstream failure.
    ///
    /// # Example
    ///
    /// ```
    /// use hookgate_core::DeliveryConfig;
    ///
    /// let config = DeliveryConfig::default();
    /// assert!(config.is_upstream_failure(500));
    /// assert!(config.is_upstream_failure(503));
    /// assert!(!config.is_upstream_failure(404));
    /// ```
    pub fn is_upstream_failure(&self, status: u16) -> bool {
        status >= self.fallback_status_threshold
    }
}

/// Configuration for the delivery queue.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Queue name, used in logs
    pub name: String,
    /// Messages held before publishing is refused
    pub capacity: usize,
    /// Deliveries attempted before a message is dead-lettered
    pub max_attempts: u32,
    /// Delay before a requeued message is delivered again
    pub redelivery_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: defaults::QUEUE_NAME.to_string(),
            capacity: defaults::QUEUE_CAPACITY,
            max_attempts: defaults::QUEUE_MAX_ATTEMPTS,
            redelivery_delay: defaults::QUEUE_REDELIVERY_DELAY,
        }
    }
}

impl QueueConfig {
    /// Returns `true` if the queue can hold and deliver at least one message.
    pub fn is_valid(&self) -> bool {
        self.capacity > 0 && self.max_attempts > 0
    }
}

/// Correlation identifier assigned to every inbound request.
///
/// Travels with the request through forwarding and, for queued delivery,
/// inside the serialized payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
