use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use super::{DeliveryContext, Forwarder};
use crate::error::Result;
use crate::proxy::ForwardedResponse;
use crate::request::InboundRequest;
use crate::types::DeliveryConfig;

/// Tries instant delivery first and queues the request if the upstream is
/// unreachable or answers with a status at or above the configured
/// threshold.
///
/// Errors that are not transport failures, such as an unusable target URL,
/// are returned without queueing.
pub struct FallbackForwarder {
    instant: Arc<dyn Forwarder>,
    queued: Arc<dyn Forwarder>,
    delivery: DeliveryConfig,
}

impl FallbackForwarder {
    /// Combines an instant and a queued strategy.
    pub fn new(
        instant: Arc<dyn Forwarder>,
        queued: Arc<dyn Forwarder>,
        delivery: DeliveryConfig,
    ) -> Self {
        Self {
            instant,
            queued,
            delivery,
        }
    }
}

#[async_trait]
impl Forwarder for FallbackForwarder {
    async fn forward(
        &self,
        ctx: &DeliveryContext,
        request: &InboundRequest,
        target: &Url,
    ) -> Result<ForwardedResponse> {
        match self.instant.forward(ctx, request, target).await {
            Ok(response) if self.delivery.is_upstream_failure(response.status.as_u16()) => {
                warn!(
                    request_id = %ctx.request_id,
                    rule = %ctx.rule,
                    status = response.status.as_u16(),
                    threshold = self.delivery.fallback_status_threshold,
                    "Upstream failed, fallback to queued"
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if e.is_transport() => {
                warn!(
                    request_id = %ctx.request_id,
                    rule = %ctx.rule,
                    error = %e,
                    "Upstream unreachable, fallback to queued"
                );
            }
            Err(e) => return Err(e),
        }

        self.queued.forward(ctx, request, target).await
    }
}
