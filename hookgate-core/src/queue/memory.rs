//! Bounded in-process queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Consumer, MessageHandler, Publisher};
use crate::error::{HookGateError, ProcessingError, Result};
use crate::types::{QueueConfig, QueueProvider};

#[derive(Debug)]
struct Envelope {
    payload: Bytes,
    attempt: u32,
}

/// A message that ran out of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Payload as published.
    pub payload: Bytes,
    /// Deliveries made.
    pub attempts: u32,
    /// Error from the last attempt.
    pub reason: String,
}

/// Counters since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub published: u64,
    pub acked: u64,
    pub requeued: u64,
    pub discarded: u64,
    pub dead_lettered: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    discarded: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Bounded queue living in the gateway process.
///
/// Implements both [`Publisher`] and [`Consumer`]. Publishing to a full
/// queue fails immediately rather than waiting. Retryable failures are
/// redelivered after `redelivery_delay` until `max_attempts` deliveries
/// have been made; the message is then dead-lettered.
///
/// Messages do not survive a restart.
pub struct InMemoryQueue {
    config: QueueConfig,
    tx: mpsc::Sender<Envelope>,
    rx: Mutex<mpsc::Receiver<Envelope>>,
    closed: AtomicBool,
    dead_letters: Mutex<Vec<DeadLetter>>,
    counters: Counters,
}

impl InMemoryQueue {
    /// Creates a queue with the given configuration.
    ///
    /// A capacity of 0 is raised to 1.
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        Self {
            config,
            tx,
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
            dead_letters: Mutex::new(Vec::new()),
            counters: Counters::default(),
        }
    }

    /// Creates a queue from a configuration provider.
    pub fn from_config(config: &impl QueueProvider) -> Self {
        Self::new(config.queue_config().clone())
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Refuses further publishes. Messages already queued are still
    /// delivered.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Messages waiting for delivery, excluding delayed redeliveries.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            published: self.counters.published.load(Ordering::Relaxed),
            acked: self.counters.acked.load(Ordering::Relaxed),
            requeued: self.counters.requeued.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
        }
    }

    /// Messages that ran out of attempts, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().await.clone()
    }

    async fn settle(
        &self,
        envelope: Envelope,
        outcome: std::result::Result<(), ProcessingError>,
    ) {
        let queue = self.config.name.as_str();
        let attempt = envelope.attempt;

        let err = match outcome {
            Ok(()) => {
                self.counters.acked.fetch_add(1, Ordering::Relaxed);
                debug!(queue, attempt, "Message acked");
                return;
            }
            Err(err) => err,
        };

        if err.is_fatal() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            error!(queue, attempt, error = %err, "Message discarded");
        } else if attempt >= self.config.max_attempts {
            self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
            error!(queue, attempt, error = %err, "Message dead-lettered");
            self.dead_letters.lock().await.push(DeadLetter {
                payload: envelope.payload,
                attempts: attempt,
                reason: err.inner().to_string(),
            });
        } else {
            self.counters.requeued.fetch_add(1, Ordering::Relaxed);
            warn!(
                queue,
                attempt,
                max_attempts = self.config.max_attempts,
                error = %err,
                "Message requeued"
            );
            self.redeliver(Envelope {
                payload: envelope.payload,
                attempt: attempt + 1,
            });
        }
    }

    fn redeliver(&self, envelope: Envelope) {
        let tx = self.tx.clone();
        let delay = self.config.redelivery_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(envelope).await.is_err() {
                warn!("Queue dropped before redelivery");
            }
        });
    }
}

impl std::fmt::Debug for InMemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQueue")
            .field("config", &self.config)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Publisher for InMemoryQueue {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(HookGateError::Publish("queue closed".to_string()));
        }

        self.tx
            .try_send(Envelope {
                payload,
                attempt: 1,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    HookGateError::Publish("queue at capacity".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    HookGateError::Publish("queue closed".to_string())
                }
            })?;

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl Consumer for InMemoryQueue {
    async fn start_consumer(
        &self,
        shutdown: CancellationToken,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let mut rx = self.rx.try_lock().map_err(|_| {
            HookGateError::ConfigError(format!(
                "queue '{}' already has a consumer",
                self.config.name
            ))
        })?;

        info!(queue = %self.config.name, "Consumer started");
        loop {
            let envelope = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = rx.recv() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let outcome = handler.handle(envelope.payload.clone()).await;
            self.settle(envelope, outcome).await;
        }
        info!(queue = %self.config.name, "Consumer stopped");

        Ok(())
    }
}
