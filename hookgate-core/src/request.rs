//! Inbound request snapshot.
//!
//! The gateway reads each caller's body exactly once into an
//! [`InboundRequest`]. Rule matching, outbound request building and any
//! later delivery attempt all work from this snapshot, so a fallback to the
//! queue after a failed instant attempt still sees the full body.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{HeaderMap, Method, Request, Uri};

use crate::error::{HookGateError, Result};
use crate::headers;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn body_error(err: BoxError, max_body_size: usize) -> HookGateError {
    if err.downcast_ref::<LengthLimitError>().is_some() {
        // Streamed past the limit; the full length is never read.
        HookGateError::BodyTooLarge {
            size: max_body_size.saturating_add(1),
            max: max_body_size,
        }
    } else {
        HookGateError::BodyReadError(err.to_string())
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Request target as received (path and query).
    pub uri: Uri,
    /// Host the caller addressed, from the `Host` header or the URI authority.
    pub host: String,
    /// Headers as received.
    pub headers: HeaderMap,
    /// Buffered body. Cloning shares the bytes without copying.
    pub body: Bytes,
    /// Peer address of the caller, when known.
    pub remote_addr: Option<SocketAddr>,
    /// Whether the inbound connection was TLS terminated in front of us.
    pub tls: bool,
}

impl InboundRequest {
    /// Creates an empty request for `method` and `uri`.
    ///
    /// The host is taken from the URI authority, if any.
    pub fn new(method: Method, uri: Uri) -> Self {
        let host = uri.authority().map(|a| a.to_string()).unwrap_or_default();
        Self {
            method,
            uri,
            host,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            tls: false,
        }
    }

    /// Buffers a hyper request into a snapshot.
    ///
    /// With a limit set, a declared length above it is refused before any
    /// byte is read, and a streamed body stops being read as soon as it
    /// passes the limit.
    ///
    /// # Arguments
    ///
    /// * `req` - The incoming request; its body is drained here
    /// * `remote_addr` - Peer address of the connection
    /// * `max_body_size` - Body limit in bytes (0 = unlimited)
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::BodyReadError`] if the body stream fails and
    /// [`HookGateError::BodyTooLarge`] if it exceeds `max_body_size`.
    pub async fn from_request<B>(
        req: Request<B>,
        remote_addr: Option<SocketAddr>,
        max_body_size: usize,
    ) -> Result<Self>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = if max_body_size == 0 {
            body.collect()
                .await
                .map_err(|e| body_error(e.into(), max_body_size))?
                .to_bytes()
        } else {
            let declared = usize::try_from(body.size_hint().lower()).unwrap_or(usize::MAX);
            if declared > max_body_size {
                return Err(HookGateError::BodyTooLarge {
                    size: declared,
                    max: max_body_size,
                });
            }
            Limited::new(body, max_body_size)
                .collect()
                .await
                .map_err(|e| body_error(e, max_body_size))?
                .to_bytes()
        };

        let host = parts
            .headers
            .get(headers::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            host,
            headers: parts.headers,
            body,
            remote_addr,
            tls: false,
        })
    }

    /// Sets a header, replacing any previous value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = hyper::header::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HookGateError::InvalidHeader(e.to_string()))?;
        let value = hyper::header::HeaderValue::from_str(value)
            .map_err(|e| HookGateError::InvalidHeader(e.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the caller address.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Sets the host the caller addressed.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Request path, never empty for origin-form targets.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string, if present.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::Frame;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    /// Chunked body with no declared length that counts frames handed out.
    struct ChunkedBody {
        chunks: VecDeque<std::result::Result<Bytes, &'static str>>,
        polled: Arc<AtomicUsize>,
    }

    impl ChunkedBody {
        fn new(chunks: Vec<std::result::Result<Bytes, &'static str>>) -> (Self, Arc<AtomicUsize>) {
            let polled = Arc::new(AtomicUsize::new(0));
            let body = Self {
                chunks: chunks.into(),
                polled: polled.clone(),
            };
            (body, polled)
        }
    }

    impl Body for ChunkedBody {
        type Data = Bytes;
        type Error = BoxError;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<std::result::Result<Frame<Bytes>, BoxError>>> {
            let next = self.chunks.pop_front();
            if next.is_some() {
                self.polled.fetch_add(1, Ordering::SeqCst);
            }
            Poll::Ready(next.map(|chunk| chunk.map(Frame::data).map_err(BoxError::from)))
        }
    }

    #[tokio::test]
    async fn test_from_request_buffers_body_and_host() {
        let req = Request::builder()
            .method("POST")
            .uri("/hooks/github?x=1")
            .header("host", "gateway.local:8080")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();

        let inbound = InboundRequest::from_request(req, Some(addr), 0).await.unwrap();

        assert_eq!(inbound.method, Method::POST);
        assert_eq!(inbound.path(), "/hooks/github");
        assert_eq!(inbound.query(), Some("x=1"));
        assert_eq!(inbound.host, "gateway.local:8080");
        assert_eq!(inbound.body, Bytes::from_static(b"payload"));
        assert_eq!(inbound.remote_addr, Some(addr));
        assert!(!inbound.tls);
    }

    #[tokio::test]
    async fn test_from_request_host_from_authority() {
        let req = Request::builder()
            .uri("http://example.com/path")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let inbound = InboundRequest::from_request(req, None, 0).await.unwrap();
        assert_eq!(inbound.host, "example.com");
    }

    #[tokio::test]
    async fn test_from_request_rejects_large_body() {
        let req = Request::builder()
            .uri("/")
            .body(Full::new(Bytes::from(vec![0u8; 32])))
            .unwrap();

        let err = InboundRequest::from_request(req, None, 16).await.unwrap_err();
        assert!(matches!(
            err,
            HookGateError::BodyTooLarge { size: 32, max: 16 }
        ));
    }

    #[test]
    fn test_clone_shares_body() {
        let inbound = InboundRequest::new(Method::POST, Uri::from_static("/x"))
            .with_body(Bytes::from_static(b"abc"));
        let copy = inbound.clone();
        assert_eq!(copy.body, inbound.body);
        assert_eq!(copy.body.as_ptr(), inbound.body.as_ptr());
    }

    #[test]
    fn test_with_header_rejects_invalid_name() {
        let inbound = InboundRequest::new(Method::GET, Uri::from_static("/"));
        assert!(inbound.with_header("bad header", "v").is_err());
    }

    // ===========================================
    // Streaming limit tests
    // ===========================================

    #[tokio::test]
    async fn test_streamed_body_stops_at_limit() {
        let chunk = || Ok(Bytes::from(vec![b'x'; 8]));
        let (body, polled) = ChunkedBody::new(vec![chunk(), chunk(), chunk(), chunk(), chunk()]);
        let req = Request::builder().uri("/").body(body).unwrap();

        let err = InboundRequest::from_request(req, None, 12).await.unwrap_err();

        assert!(matches!(
            err,
            HookGateError::BodyTooLarge { size: 13, max: 12 }
        ));
        assert_eq!(err.status_code(), hyper::StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_streamed_body_within_limit() {
        let (body, _) = ChunkedBody::new(vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);
        let req = Request::builder().uri("/").body(body).unwrap();

        let inbound = InboundRequest::from_request(req, None, 4).await.unwrap();
        assert_eq!(inbound.body, Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn test_stream_failure_is_read_error() {
        let (body, _) = ChunkedBody::new(vec![Ok(Bytes::from_static(b"ab")), Err("reset")]);
        let req = Request::builder().uri("/").body(body).unwrap();

        let err = InboundRequest::from_request(req, None, 1024).await.unwrap_err();
        assert!(matches!(err, HookGateError::BodyReadError(ref m) if m == "reset"));
    }
}
