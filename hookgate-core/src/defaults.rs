//! Default configuration values for HookGate.
//!
//! This module centralizes all default values used throughout HookGate,
//! ensuring consistency between production code and tests.

use std::time::Duration;

/// Default listen port.
pub const LISTEN_PORT: u16 = 8080;

/// Default proxy timeout in seconds.
pub const PROXY_TIMEOUT_SECS: u64 = 30;

/// Default proxy timeout duration.
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(PROXY_TIMEOUT_SECS);

/// Default maximum body size in megabytes.
pub const MAX_BODY_SIZE_MB: usize = 10;

/// Default maximum body size in bytes.
pub const MAX_BODY_SIZE: usize = MAX_BODY_SIZE_MB * 1024 * 1024;

/// Default maximum concurrent connections.
pub const MAX_CONNECTIONS: usize = 10_000;

/// Lowest upstream status treated as a server-side failure.
///
/// Fallback delivery switches to the queue at or above it, and the queue
/// listener requeues at or above it.
pub const FALLBACK_STATUS_THRESHOLD: u16 = 500;

/// Default queue name.
pub const QUEUE_NAME: &str = "hookgate.webhook.default";

/// Default number of messages the in-memory queue holds.
pub const QUEUE_CAPACITY: usize = 1024;

/// Default delivery attempts before a message is dead-lettered.
pub const QUEUE_MAX_ATTEMPTS: u32 = 5;

/// Default delay before a requeued message becomes visible again, in milliseconds.
pub const QUEUE_REDELIVERY_DELAY_MS: u64 = 1_000;

/// Default redelivery delay.
pub const QUEUE_REDELIVERY_DELAY: Duration = Duration::from_millis(QUEUE_REDELIVERY_DELAY_MS);

/// How long shutdown waits for open connections to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
