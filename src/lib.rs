//! HookGate - Rule-driven webhook gateway
//!
//! HookGate accepts webhooks over HTTP, picks the first rule whose triggers
//! match the request, and delivers it to the rule's upstream:
//! - `instant` forwards synchronously and relays the upstream response
//! - `queued` publishes the request and answers `202 Accepted`
//! - `fallback` tries instant delivery and queues on upstream failure
//!
//! A queue listener replays queued requests until the upstream accepts them.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hookgate::app::App;
//! use hookgate::config::GatewayConfig;
//! use hookgate::rules_file;
//! use hookgate_core::transport::ReqwestTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load(None)?;
//! let rules = rules_file::load_rules("rules.toml".as_ref())?;
//! let app = App::new(&config, rules, Arc::new(ReqwestTransport::build()?));
//!
//! let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
//! app.run(listener, tokio_util::sync::CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`app`] - Component wiring and lifecycle
//! - [`args`] - Command line argument parsing
//! - [`config`] - Configuration file and environment overrides
//! - [`connection`] - Connection limiting and tracking
//! - [`env_vars`] - Environment variable constants
//! - [`logging`] - Tracing subscriber setup
//! - [`rules_file`] - Rule file loading
//! - [`server`] - Accept loop and startup banner
//!
//! # Re-exports from hookgate-core
//!
//! - [`rules`] - Triggers, trigger sets and rules
//! - [`forwarder`] - Delivery strategies
//! - [`queue`] - Queue contract and in-memory queue
//! - [`request_handler`] - HTTP request processing

#![forbid(unsafe_code)]

pub mod app;
pub mod args;
pub mod config;
pub mod connection;
pub mod env_vars;
pub mod logging;
pub mod rules_file;
pub mod server;

// Re-export hookgate-core modules
pub use hookgate_core::forwarder;
pub use hookgate_core::listener;
pub use hookgate_core::queue;
pub use hookgate_core::request_handler;
pub use hookgate_core::rules;
pub use hookgate_core::types;

// Re-export commonly used items at crate root
pub use app::App;
pub use config::GatewayConfig;
pub use hookgate_core::{
    // Aggregated configuration trait
    ConfigProvider,
    // Composable configuration traits
    ConnectionProvider,
    DeliveryConfig,
    DeliveryProvider,
    // Errors
    HookGateError,
    // Configuration structs
    ProxyConfig,
    ProxyProvider,
    QueueConfig,
    QueueProvider,
    Result,
};
