//! Consumer side of queued delivery.
//!
//! [`ReplayHandler`] turns a queued payload back into an outbound request
//! and sends it to the upstream. [`QueueListener`] drives a handler from a
//! [`Consumer`] until shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::error::{HookGateError, ProcessingError, Result};
use crate::proxy::SerializedRequest;
use crate::queue::{Consumer, MessageHandler};
use crate::transport::Transport;
use crate::types::{DeliveryConfig, DeliveryProvider, ProxyProvider};

/// Replays queued requests against their upstream.
///
/// - A payload that cannot be decoded or rebuilt is fatal
/// - A transport error is retryable
/// - A status at or above the fallback threshold is retryable
/// - Anything else acknowledges the message
pub struct ReplayHandler {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    timeout: Duration,
    delivery: DeliveryConfig,
}

impl ReplayHandler {
    /// Creates a handler replaying through `transport`.
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        timeout: Duration,
        delivery: DeliveryConfig,
    ) -> Self {
        Self {
            transport,
            clock,
            timeout,
            delivery,
        }
    }

    /// Creates a handler using the proxy timeout and delivery threshold
    /// from `config`.
    pub fn from_config<C: ProxyProvider + DeliveryProvider>(
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        config: &C,
    ) -> Self {
        Self::new(
            transport,
            clock,
            config.proxy_config().timeout,
            config.delivery_config().clone(),
        )
    }
}

#[async_trait]
impl MessageHandler for ReplayHandler {
    async fn handle(&self, payload: Bytes) -> std::result::Result<(), ProcessingError> {
        let serialized = SerializedRequest::from_slice(&payload).map_err(ProcessingError::fatal)?;
        let request_id = serialized.id;
        let request = serialized.into_outbound().map_err(ProcessingError::fatal)?;

        info!(
            request_id = %request_id,
            method = %request.method,
            upstream = %request.url,
            "Sending request"
        );

        let start = self.clock.now();
        let response = self
            .transport
            .round_trip(&request, self.timeout)
            .await
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "Replay failed");
                ProcessingError::retryable(e)
            })?;
        let status = response.status.as_u16();

        info!(
            request_id = %request_id,
            status,
            duration_ms = self.clock.elapsed_since(start).as_millis() as u64,
            "Response received"
        );

        if self.delivery.is_upstream_failure(status) {
            return Err(ProcessingError::retryable(HookGateError::UpstreamStatus(
                status,
            )));
        }
        Ok(())
    }
}

/// Runs a [`MessageHandler`] against a [`Consumer`].
pub struct QueueListener {
    consumer: Arc<dyn Consumer>,
    handler: Arc<dyn MessageHandler>,
}

impl QueueListener {
    /// Pairs a consumer with the handler for its messages.
    pub fn new(consumer: Arc<dyn Consumer>, handler: Arc<dyn MessageHandler>) -> Self {
        Self { consumer, handler }
    }

    /// Consumes until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Propagates errors from starting the consumer.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!("Queue listener started");
        let result = self
            .consumer
            .start_consumer(shutdown, Arc::clone(&self.handler))
            .await;
        info!("Queue listener stopped");
        result
    }
}
