use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use url::Url;

use super::{DeliveryContext, Forwarder};
use crate::error::Result;
use crate::proxy::{ForwardedResponse, build_outbound_request};
use crate::queue::Publisher;
use crate::request::InboundRequest;

/// Publishes the request to the queue and answers `202 Accepted`.
///
/// A publish failure is returned to the caller. Nothing is retried here;
/// once published, redelivery belongs to the queue.
pub struct QueuedForwarder {
    publisher: Arc<dyn Publisher>,
}

impl QueuedForwarder {
    /// Creates a forwarder publishing through `publisher`.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Forwarder for QueuedForwarder {
    async fn forward(
        &self,
        ctx: &DeliveryContext,
        request: &InboundRequest,
        target: &Url,
    ) -> Result<ForwardedResponse> {
        let outbound = build_outbound_request(request, target)?;
        let upstream = outbound.url.to_string();
        let payload = outbound.into_serialized(ctx.request_id).to_bytes()?;

        info!(
            request_id = %ctx.request_id,
            rule = %ctx.rule,
            upstream = %upstream,
            delay_secs = ctx.delay.as_secs(),
            retries = ctx.retries,
            "Attempting to publish request"
        );

        if let Err(e) = self.publisher.publish(payload).await {
            error!(request_id = %ctx.request_id, error = %e, "Publish failed");
            return Err(e);
        }

        info!(request_id = %ctx.request_id, "Published request");
        Ok(ForwardedResponse::accepted())
    }
}
