//! Test utilities for HookGate.
//!
//! This module provides shared test doubles used across unit tests.
//! It is only compiled when running tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::clock::Clock;
use crate::error::{HookGateError, ProcessingError, Result};
use crate::proxy::{ForwardedResponse, OutboundRequest};
use crate::queue::{MessageHandler, Publisher};
use crate::request::InboundRequest;
use crate::transport::Transport;
use crate::types::{
    ConnectionProvider, DeliveryConfig, DeliveryProvider, ProxyConfig, ProxyProvider, QueueConfig,
    QueueProvider,
};

// ============================================================================
// Configuration
// ============================================================================

/// Shared test configuration for unit tests.
///
/// This struct implements all configuration traits with sensible defaults
/// and builder methods for customization.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub proxy: ProxyConfig,
    pub delivery: DeliveryConfig,
    pub queue: QueueConfig,
    pub max_connections: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig {
                timeout: Duration::from_secs(5),
                max_body_size: 1024 * 1024,
            },
            delivery: DeliveryConfig::default(),
            queue: QueueConfig {
                name: "test.queue".to_string(),
                capacity: 16,
                max_attempts: 3,
                redelivery_delay: Duration::from_millis(10),
            },
            max_connections: 100,
        }
    }
}

impl TestConfig {
    /// Create a new test configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the body size limit.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.proxy.max_body_size = bytes;
        self
    }

    /// Configure the fallback status threshold.
    pub fn with_fallback_threshold(mut self, status: u16) -> Self {
        self.delivery.fallback_status_threshold = status;
        self
    }
}

impl ProxyProvider for TestConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }
}

impl DeliveryProvider for TestConfig {
    fn delivery_config(&self) -> &DeliveryConfig {
        &self.delivery
    }
}

impl QueueProvider for TestConfig {
    fn queue_config(&self) -> &QueueConfig {
        &self.queue
    }
}

impl ConnectionProvider for TestConfig {
    fn max_connections(&self) -> usize {
        self.max_connections
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One scripted outcome of [`MockTransport`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    ConnectionRefused,
    Timeout,
}

impl ScriptedReply {
    pub fn status(status: u16) -> Self {
        Self::status_with_body(status, "")
    }

    pub fn status_with_body(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            headers: Vec::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Self::Respond { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }
}

/// Transport answering from a script and recording what it was sent.
///
/// Replies are used in order; the last one repeats. With an empty script
/// every call answers `200 OK`.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<OutboundRequest>>,
    timeouts: Mutex<Vec<Duration>>,
    advance: Option<(Arc<ManualClock>, Duration)>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: ScriptedReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Moves `clock` forward by `by` during every round trip.
    pub fn advancing(mut self, clock: Arc<ManualClock>, by: Duration) -> Self {
        self.advance = Some((clock, by));
        self
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }

    fn next_reply(&self) -> ScriptedReply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::status(200))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn round_trip(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<ForwardedResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.timeouts.lock().unwrap().push(timeout);
        if let Some((clock, by)) = &self.advance {
            clock.advance(*by);
        }

        match self.next_reply() {
            ScriptedReply::Respond {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_str(&value).unwrap(),
                    );
                }
                Ok(ForwardedResponse::from_upstream(
                    StatusCode::from_u16(status).unwrap(),
                    map,
                    body,
                ))
            }
            ScriptedReply::ConnectionRefused => Err(HookGateError::UpstreamConnectionFailed(
                "connection refused".to_string(),
            )),
            ScriptedReply::Timeout => Err(HookGateError::UpstreamTimeout(
                "operation timed out".to_string(),
            )),
        }
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Publisher keeping every payload in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Bytes>>,
    failure: Option<String>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher refusing every payload with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failure: Some(reason.to_string()),
        }
    }

    pub fn published(&self) -> Vec<Bytes> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(HookGateError::Publish(reason.clone()));
        }
        self.published.lock().unwrap().push(payload);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum HandlerScript {
    Ok,
    Fatal,
    Retryable,
    RetryThenOk(usize),
}

/// Message handler with a fixed outcome script.
#[derive(Debug)]
pub struct ScriptedHandler {
    script: HandlerScript,
    delay: Duration,
    calls: AtomicUsize,
    payloads: Mutex<Vec<Bytes>>,
}

impl ScriptedHandler {
    fn with_script(script: HandlerScript) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::with_script(HandlerScript::Ok)
    }

    pub fn always_fatal() -> Self {
        Self::with_script(HandlerScript::Fatal)
    }

    pub fn always_retryable() -> Self {
        Self::with_script(HandlerScript::Retryable)
    }

    /// Fails retryably `failures` times, then succeeds.
    pub fn retry_then_ok(failures: usize) -> Self {
        Self::with_script(HandlerScript::RetryThenOk(failures))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, payload: Bytes) -> std::result::Result<(), ProcessingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let retryable = || ProcessingError::retryable(HookGateError::UpstreamStatus(503));
        match self.script {
            HandlerScript::Ok => Ok(()),
            HandlerScript::Fatal => Err(ProcessingError::fatal(HookGateError::InvalidUrl(
                "not a url".to_string(),
            ))),
            HandlerScript::Retryable => Err(retryable()),
            HandlerScript::RetryThenOk(failures) if call < failures => Err(retryable()),
            HandlerScript::RetryThenOk(_) => Ok(()),
        }
    }
}

// ============================================================================
// Requests and sockets
// ============================================================================

/// A buffered POST from 192.0.2.1 to `gw.local`.
pub fn inbound_post(path: &str, body: &str) -> InboundRequest {
    InboundRequest::new(Method::POST, path.parse::<Uri>().unwrap())
        .with_host("gw.local")
        .with_remote_addr("192.0.2.1:40000".parse().unwrap())
        .with_body(Bytes::from(body.to_string()))
}

/// Serves `handler` over HTTP/1 on an ephemeral local port.
pub async fn spawn_upstream<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let fut = handler(req);
                    async move { Ok::<_, Infallible>(fut.await) }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

/// Answers every connection with a 200 whose body stops short of its
/// declared length, then closes the socket.
pub async fn spawn_truncating_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nabc")
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// A local address nothing listens on.
pub async fn unused_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TestConfig::new();
        assert!(config.proxy.is_valid());
        assert!(config.queue.is_valid());
        assert_eq!(config.delivery.fallback_status_threshold, 500);
    }

    #[test]
    fn test_builder_methods() {
        let config = TestConfig::new()
            .with_max_body_size(4)
            .with_fallback_threshold(502);
        assert_eq!(config.proxy.max_body_size, 4);
        assert_eq!(config.delivery.fallback_status_threshold, 502);
    }

    #[tokio::test]
    async fn test_mock_transport_repeats_last_reply() {
        let transport = MockTransport::new()
            .reply(ScriptedReply::status(503))
            .reply(ScriptedReply::status(200));
        let request = crate::proxy::build_outbound_request(
            &inbound_post("/", ""),
            &url::Url::parse("http://up.local").unwrap(),
        )
        .unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = transport
                .round_trip(&request, Duration::from_secs(1))
                .await
                .unwrap();
            statuses.push(response.status.as_u16());
        }
        assert_eq!(statuses, vec![503, 200, 200]);
    }
}
