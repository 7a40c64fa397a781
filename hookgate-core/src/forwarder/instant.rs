use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::{DeliveryContext, Forwarder};
use crate::clock::SharedClock;
use crate::error::Result;
use crate::proxy::{ForwardedResponse, build_outbound_request};
use crate::request::InboundRequest;
use crate::transport::Transport;

/// Forwards synchronously and relays the upstream response unchanged.
pub struct InstantForwarder {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
}

impl InstantForwarder {
    /// Creates a forwarder over `transport`, timing round trips with `clock`.
    pub fn new(transport: Arc<dyn Transport>, clock: SharedClock) -> Self {
        Self { transport, clock }
    }
}

#[async_trait]
impl Forwarder for InstantForwarder {
    async fn forward(
        &self,
        ctx: &DeliveryContext,
        request: &InboundRequest,
        target: &Url,
    ) -> Result<ForwardedResponse> {
        let outbound = build_outbound_request(request, target)?;
        debug!(
            request_id = %ctx.request_id,
            upstream = %outbound.url,
            timeout_ms = ctx.timeout.as_millis() as u64,
            "Sending instant request"
        );

        let start = self.clock.now();
        let response = self.transport.round_trip(&outbound, ctx.timeout).await?;
        let latency = self.clock.elapsed_since(start);

        info!(
            request_id = %ctx.request_id,
            rule = %ctx.rule,
            upstream = %outbound.url,
            status = response.status.as_u16(),
            duration_ms = latency.as_millis() as u64,
            "Instant delivery completed"
        );

        Ok(response.with_latency(latency))
    }
}
