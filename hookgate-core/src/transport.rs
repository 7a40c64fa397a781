//! Upstream HTTP transport.
//!
//! Forwarders and the queue listener send requests through the
//! [`Transport`] trait. [`ReqwestTransport`] is the production
//! implementation, sharing one pooled [`reqwest::Client`] across all
//! deliveries.

use std::time::Duration;

use async_trait::async_trait;
use hyper::HeaderMap;
use hyper::header::HeaderValue;

use crate::error::{HookGateError, Result};
use crate::headers;
use crate::proxy::{ForwardedResponse, OutboundRequest};

/// Sends one request to an upstream and returns its response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single round trip bounded by `timeout`.
    ///
    /// Dropping the returned future cancels the request.
    ///
    /// # Errors
    ///
    /// Network failures map to [`HookGateError::UpstreamConnectionFailed`],
    /// [`HookGateError::UpstreamTimeout`] or
    /// [`HookGateError::HttpClientError`]. A response body cut short maps to
    /// [`HookGateError::UpstreamBodyError`]. Any status code, including 5xx,
    /// is a successful round trip.
    ///
    /// A non-empty [`OutboundRequest::host`] is sent as the `Host` header.
    async fn round_trip(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<ForwardedResponse>;
}

/// [`Transport`] backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    ///
    /// The client should not follow redirects, so upstream redirects are
    /// relayed to the caller as-is.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client suitable for proxying.
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::HttpClientError`] if the TLS backend cannot
    /// be initialized.
    pub fn build() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<ForwardedResponse> {
        // Content-Length is derived by the client. Host keeps the
        // inbound authority when one was received.
        let mut outgoing = HeaderMap::with_capacity(request.headers.len() + 1);
        for (name, value) in request.headers.iter() {
            if name != headers::HOST && name != headers::CONTENT_LENGTH {
                outgoing.append(name.clone(), value.clone());
            }
        }
        if !request.host.is_empty() {
            let host = HeaderValue::from_str(&request.host)
                .map_err(|e| HookGateError::InvalidHeader(format!("host: {e}")))?;
            outgoing.insert(headers::HOST, host);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(outgoing)
            .timeout(timeout);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| HookGateError::UpstreamBodyError(e.to_string()))?;

        Ok(ForwardedResponse::from_upstream(
            status,
            response_headers,
            body,
        ))
    }
}

fn map_send_error(err: reqwest::Error) -> HookGateError {
    if err.is_timeout() {
        HookGateError::UpstreamTimeout(err.to_string())
    } else if err.is_connect() {
        HookGateError::UpstreamConnectionFailed(err.to_string())
    } else {
        HookGateError::HttpClientError(err)
    }
}
