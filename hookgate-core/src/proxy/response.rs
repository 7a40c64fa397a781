use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};

use crate::headers;

/// Response relayed back to the caller.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    /// Status code, passed through unchanged.
    pub status: StatusCode,
    /// Upstream headers, already sanitized.
    pub headers: HeaderMap,
    /// Body, passed through unchanged.
    pub body: Bytes,
    /// Round-trip time of the upstream call, when one was made.
    pub latency: Option<Duration>,
}

impl ForwardedResponse {
    /// Builds a response from upstream parts, sanitizing its headers.
    pub fn from_upstream(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Self {
        sanitize_response_headers(&mut headers);
        Self {
            status,
            headers,
            body,
            latency: None,
        }
    }

    /// The synthetic `202 Accepted` returned once a request is queued.
    pub fn accepted() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            latency: None,
        }
    }

    /// Records the measured latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Converts into a hyper response for the caller.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Removes hop-by-hop and forwarding metadata headers from an upstream
/// response before it is relayed.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    headers::remove_hop_by_hop(headers);
    headers::remove_forwarding_metadata(headers);
}
