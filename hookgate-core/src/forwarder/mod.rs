//! Delivery strategies.
//!
//! A [`Forwarder`] takes a buffered inbound request and a target URL and
//! delivers it one way or another:
//! - [`InstantForwarder`] performs the round trip now and relays the answer
//! - [`QueuedForwarder`] publishes the request and answers `202 Accepted`
//! - [`FallbackForwarder`] tries instant delivery and queues on failure
//!
//! The gateway picks one per request through a [`ForwarderRegistry`] keyed
//! by [`DeliveryMode`].

mod fallback;
mod instant;
mod queued;

pub use fallback::FallbackForwarder;
pub use instant::InstantForwarder;
pub use queued::QueuedForwarder;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::clock::SharedClock;
use crate::error::Result;
use crate::proxy::ForwardedResponse;
use crate::queue::Publisher;
use crate::request::InboundRequest;
use crate::rules::{DeliveryMode, Rule};
use crate::transport::Transport;
use crate::types::{DeliveryProvider, ProxyConfig, RequestId};

/// Per-request values threaded through delivery.
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    /// Correlation id of the inbound request.
    pub request_id: RequestId,
    /// Name of the matched rule.
    pub rule: String,
    /// Upper bound for an instant round trip.
    pub timeout: Duration,
    /// Delay configured on the matched action.
    pub delay: Duration,
    /// Retries configured on the matched action.
    pub retries: u32,
}

impl DeliveryContext {
    /// Builds the context for `rule`, using the proxy timeout when the
    /// action does not set one.
    pub fn for_rule(request_id: RequestId, rule: &Rule, proxy: &ProxyConfig) -> Self {
        let action = rule.action();
        Self {
            request_id,
            rule: rule.name().to_string(),
            timeout: action.timeout().unwrap_or(proxy.timeout),
            delay: action.delay(),
            retries: action.retries(),
        }
    }

    /// A context with default values, for callers outside the gateway.
    pub fn new(request_id: RequestId, timeout: Duration) -> Self {
        Self {
            request_id,
            rule: String::new(),
            timeout,
            delay: Duration::ZERO,
            retries: 0,
        }
    }
}

/// A delivery strategy.
///
/// Implementations must be safe to call from many requests at once and
/// must not retry internally.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Delivers `request` to `target`.
    ///
    /// `request` is left untouched so another strategy can deliver it
    /// again.
    ///
    /// # Errors
    ///
    /// Transport errors from an instant attempt are returned as-is so a
    /// caller can react to them through
    /// [`HookGateError::is_transport`](crate::HookGateError::is_transport).
    async fn forward(
        &self,
        ctx: &DeliveryContext,
        request: &InboundRequest,
        target: &Url,
    ) -> Result<ForwardedResponse>;
}

/// Forwarders keyed by delivery mode.
#[derive(Clone, Default)]
pub struct ForwarderRegistry {
    forwarders: HashMap<DeliveryMode, Arc<dyn Forwarder>>,
}

impl ForwarderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry with all three standard strategies sharing one
    /// transport and one publisher.
    pub fn standard(
        transport: Arc<dyn Transport>,
        publisher: Arc<dyn Publisher>,
        clock: SharedClock,
        config: &impl DeliveryProvider,
    ) -> Self {
        let instant: Arc<dyn Forwarder> = Arc::new(InstantForwarder::new(transport, clock));
        let queued: Arc<dyn Forwarder> = Arc::new(QueuedForwarder::new(publisher));
        let fallback = FallbackForwarder::new(
            Arc::clone(&instant),
            Arc::clone(&queued),
            config.delivery_config().clone(),
        );

        Self::new()
            .register(DeliveryMode::Instant, instant)
            .register(DeliveryMode::Queued, queued)
            .register(DeliveryMode::Fallback, Arc::new(fallback))
    }

    /// Adds or replaces the forwarder for `mode`.
    pub fn register(mut self, mode: DeliveryMode, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarders.insert(mode, forwarder);
        self
    }

    /// Looks up the forwarder for `mode`.
    pub fn get(&self, mode: DeliveryMode) -> Option<&Arc<dyn Forwarder>> {
        self.forwarders.get(&mode)
    }

    /// Returns the registered modes.
    pub fn modes(&self) -> Vec<DeliveryMode> {
        let mut modes: Vec<_> = self.forwarders.keys().copied().collect();
        modes.sort_by_key(|m| m.as_str());
        modes
    }
}

impl std::fmt::Debug for ForwarderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwarderRegistry")
            .field("modes", &self.modes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use crate::rules::{Action, Operator, TriggerSet};
    use crate::test_utils::{MockTransport, RecordingPublisher, TestConfig};

    #[test]
    fn test_standard_registry_has_all_modes() {
        let registry = ForwarderRegistry::standard(
            Arc::new(MockTransport::new()),
            Arc::new(RecordingPublisher::new()),
            clock::system(),
            &TestConfig::new(),
        );

        for mode in [
            DeliveryMode::Instant,
            DeliveryMode::Queued,
            DeliveryMode::Fallback,
        ] {
            assert!(registry.get(mode).is_some(), "{mode} missing");
        }
    }

    #[test]
    fn test_empty_registry_lookup() {
        let registry = ForwarderRegistry::new();
        assert!(registry.get(DeliveryMode::Instant).is_none());
        assert!(registry.modes().is_empty());
    }

    #[test]
    fn test_context_uses_action_timeout() {
        let action = Action::new("http://up.local", DeliveryMode::Instant)
            .unwrap()
            .with_timeout(Duration::from_secs(3))
            .with_retry_policy(Duration::from_secs(1), 4);
        let rule = Rule::new("r", TriggerSet::new(Operator::And, vec![]), action);

        let ctx = DeliveryContext::for_rule(RequestId::new(), &rule, &ProxyConfig::default());
        assert_eq!(ctx.timeout, Duration::from_secs(3));
        assert_eq!(ctx.rule, "r");
        assert_eq!(ctx.retries, 4);
        assert_eq!(ctx.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_context_falls_back_to_proxy_timeout() {
        let action = Action::new("http://up.local", DeliveryMode::Instant).unwrap();
        let rule = Rule::new("r", TriggerSet::new(Operator::And, vec![]), action);
        let proxy = ProxyConfig {
            timeout: Duration::from_secs(7),
            max_body_size: 0,
        };

        let ctx = DeliveryContext::for_rule(RequestId::new(), &rule, &proxy);
        assert_eq!(ctx.timeout, Duration::from_secs(7));
    }
}
