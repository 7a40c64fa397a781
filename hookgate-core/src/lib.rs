//! HookGate Core - Reusable webhook gateway components
//!
//! This crate provides the core functionality for routing and delivering
//! webhooks:
//! - Declarative rule matching over request path, host, method, headers and
//!   query parameters
//! - Proxy request transformation (hop-by-hop stripping, forwarding headers,
//!   path and query joining)
//! - Instant, queued and fallback delivery strategies
//! - A queue contract with an in-memory implementation and a replaying
//!   listener
//!
//! # Overview
//!
//! `hookgate-core` is framework-agnostic. Configuration is provided via the
//! [`ConfigProvider`] trait, and upstream I/O and queueing sit behind the
//! [`transport::Transport`], [`queue::Publisher`] and [`queue::Consumer`]
//! traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hookgate_core::clock;
//! use hookgate_core::forwarder::ForwarderRegistry;
//! use hookgate_core::queue::InMemoryQueue;
//! use hookgate_core::request_handler::Gateway;
//! use hookgate_core::rules::{resolve_rules, RuleConfig};
//! use hookgate_core::transport::ReqwestTransport;
//! use hookgate_core::{DeliveryConfig, DeliveryProvider, ProxyConfig, ProxyProvider};
//!
//! struct MyConfig {
//!     proxy: ProxyConfig,
//!     delivery: DeliveryConfig,
//! }
//!
//! impl ProxyProvider for MyConfig {
//!     fn proxy_config(&self) -> &ProxyConfig { &self.proxy }
//! }
//!
//! impl DeliveryProvider for MyConfig {
//!     fn delivery_config(&self) -> &DeliveryConfig { &self.delivery }
//! }
//!
//! # fn main() -> hookgate_core::Result<()> {
//! let config = MyConfig {
//!     proxy: ProxyConfig::default(),
//!     delivery: DeliveryConfig::default(),
//! };
//! let rules: Vec<RuleConfig> = Vec::new();
//! let rules = resolve_rules(rules)?;
//!
//! let queue = Arc::new(InMemoryQueue::new(Default::default()));
//! let transport = Arc::new(ReqwestTransport::build()?);
//! let forwarders = ForwarderRegistry::standard(transport, queue, clock::system(), &config);
//! let gateway = Gateway::new(rules, forwarders, &config);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration types and the [`ConfigProvider`] trait
//! - [`error`] - Error types and result aliases
//! - [`headers`] - HTTP header constants and hop-by-hop handling
//! - [`rules`] - Triggers, trigger sets and rules
//! - [`proxy`] - Outbound request building and queue serialization
//! - [`transport`] - Upstream HTTP round trips
//! - [`forwarder`] - Delivery strategies
//! - [`queue`] - Queue contract and in-memory queue
//! - [`listener`] - Replaying queued requests
//! - [`request_handler`] - HTTP request processing

#![forbid(unsafe_code)]

pub mod clock;
pub mod defaults;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod listener;
pub mod proxy;
pub mod queue;
pub mod request;
pub mod request_handler;
pub mod rules;
#[cfg(test)]
pub mod test_utils;
pub mod transport;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{HookGateError, ProcessingError, Result, ValidationError};
pub use request::InboundRequest;
pub use types::{
    // Aggregated configuration trait
    ConfigProvider,
    // Composable configuration traits
    ConnectionProvider,
    // Configuration structs
    DeliveryConfig,
    DeliveryProvider,
    ProxyConfig,
    ProxyProvider,
    QueueConfig,
    QueueProvider,
    // Correlation
    RequestId,
};
