//! Queue contract for deferred delivery.
//!
//! The gateway publishes serialized requests through a [`Publisher`]; the
//! queue listener receives them through a [`Consumer`] and reports each
//! outcome back from its [`MessageHandler`]:
//! - `Ok(())` acknowledges and removes the message
//! - [`ProcessingError::Fatal`] discards it without requeue
//! - [`ProcessingError::Retryable`] requeues it for a later attempt
//!
//! Attempt limits and dead-lettering are the queue's business.
//! [`InMemoryQueue`] is the bundled implementation.

mod memory;

pub use memory::{DeadLetter, InMemoryQueue, QueueStats};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::{ProcessingError, Result};

/// Sends payloads to the queue.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one payload.
    ///
    /// Returns once the queue has taken ownership of the payload.
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::Publish`](crate::HookGateError::Publish)
    /// when the queue refuses it.
    async fn publish(&self, payload: Bytes) -> Result<()>;
}

/// Processes one dequeued payload.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles `payload`. The returned classification decides what the
    /// queue does with the message.
    async fn handle(&self, payload: Bytes) -> std::result::Result<(), ProcessingError>;
}

/// Receives payloads from the queue.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Feeds messages to `handler` until `shutdown` is cancelled.
    ///
    /// A message already handed to `handler` is settled before the loop
    /// returns.
    async fn start_consumer(
        &self,
        shutdown: CancellationToken,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()>;
}
