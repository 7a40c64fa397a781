//! Process wiring: queue, forwarders, gateway, server and queue listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::connection::{ConnectionLimiter, ConnectionTracker};
use crate::server;
use hookgate_core::clock::{self, SharedClock};
use hookgate_core::defaults;
use hookgate_core::forwarder::ForwarderRegistry;
use hookgate_core::listener::{QueueListener, ReplayHandler};
use hookgate_core::queue::InMemoryQueue;
use hookgate_core::request_handler::Gateway;
use hookgate_core::rules::Rule;
use hookgate_core::transport::Transport;
use hookgate_core::{ConnectionProvider, HookGateError, Result};

/// A fully wired gateway, ready to serve.
pub struct App {
    gateway: Arc<Gateway>,
    queue: Arc<InMemoryQueue>,
    listener: QueueListener,
    limiter: ConnectionLimiter,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl App {
    /// Wires every component around one transport and one in-memory queue.
    pub fn new(config: &GatewayConfig, rules: Vec<Rule>, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(config, rules, transport, clock::system())
    }

    /// Same as [`App::new`] with an explicit clock.
    pub fn with_clock(
        config: &GatewayConfig,
        rules: Vec<Rule>,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
    ) -> Self {
        let queue = Arc::new(InMemoryQueue::from_config(config));
        let forwarders = ForwarderRegistry::standard(
            Arc::clone(&transport),
            queue.clone(),
            Arc::clone(&clock),
            config,
        );
        let gateway = Arc::new(Gateway::new(rules, forwarders, config));
        let replay = ReplayHandler::from_config(transport, clock, config);
        let listener = QueueListener::new(queue.clone(), Arc::new(replay));

        Self {
            gateway,
            queue,
            listener,
            limiter: ConnectionLimiter::new(config.max_connections()),
            tracker: ConnectionTracker::new(),
            shutdown_grace: defaults::SHUTDOWN_GRACE,
        }
    }

    /// Overrides how long shutdown waits for open connections.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// The request gateway.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// The queue behind queued and fallback delivery.
    pub fn queue(&self) -> &Arc<InMemoryQueue> {
        &self.queue
    }

    /// Serves `listener` and replays queued requests until `shutdown` is
    /// cancelled.
    ///
    /// Shutdown stops accepting, drains open connections, then stops the
    /// queue listener so requests accepted during the drain are still
    /// published.
    ///
    /// # Errors
    ///
    /// Returns the queue listener's startup error, if any.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let consumer_shutdown = CancellationToken::new();
        let queue_listener = self.listener;
        let mut consumer = tokio::spawn({
            let token = consumer_shutdown.clone();
            async move { queue_listener.run(token).await }
        });

        let serve = server::serve(
            listener,
            Arc::clone(&self.gateway),
            self.limiter.clone(),
            self.tracker.clone(),
            shutdown.clone(),
        );

        // The queue listener only returns early when its consumer failed to start.
        let early_exit = tokio::select! {
            () = serve => None,
            joined = &mut consumer => Some(joined),
        };
        if let Some(joined) = early_exit {
            shutdown.cancel();
            return match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(HookGateError::ConfigError(format!(
                    "queue listener panicked: {join_err}"
                ))),
            };
        }

        if !self.tracker.wait_for_shutdown(self.shutdown_grace).await {
            warn!(
                open_connections = self.tracker.count(),
                grace_secs = self.shutdown_grace.as_secs(),
                "Shutdown grace elapsed with open connections"
            );
        }

        consumer_shutdown.cancel();
        self.queue.close();

        match consumer.await {
            Ok(result) => result?,
            Err(join_err) => error!(error = %join_err, "Queue listener task failed"),
        }

        let stats = self.queue.stats();
        info!(
            published = stats.published,
            acked = stats.acked,
            requeued = stats.requeued,
            discarded = stats.discarded,
            dead_lettered = stats.dead_lettered,
            pending = self.queue.pending(),
            "Queue stopped"
        );
        Ok(())
    }
}
